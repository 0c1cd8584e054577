use crate::align::contact_patch::align;
use crate::anchor::analysis::AnchorAnalysis;
use crate::config::audit::AuditConfig;
use crate::foundation::core::RgbaFrame;
use crate::foundation::error::SpriteGateResult;
use crate::gates::hard::{HardGateOpts, evaluate_hard_gates};
use crate::gates::reason::ReasonCode;
use crate::metrics::orphan::OrphanClass;
use crate::metrics::suite::{SuiteInput, run_soft_metrics};
use crate::report::metrics_record::{AttemptMetrics, HardFailureSummary};
use crate::scoring::composite::{CategoryInputs, composite};
use crate::state::model::AttemptOutcome;

/// Read-only inputs shared by every audit of a run.
#[derive(Clone, Copy, Debug)]
pub struct AuditContext<'a> {
    pub cfg: &'a AuditConfig,
    pub anchor: &'a AnchorAnalysis,
    pub anchor_frame: &'a RgbaFrame,
    /// Previous approved frame, already aligned.
    pub previous: Option<&'a RgbaFrame>,
}

impl AuditContext<'_> {
    /// Gate limits for this run. The dimension gate always checks against the anchor canvas.
    pub fn hard_gate_opts(&self) -> HardGateOpts {
        HardGateOpts {
            expected_width: self.anchor.width,
            expected_height: self.anchor.height,
            min_file_bytes: self.cfg.gates.min_file_bytes,
            max_file_bytes: self.cfg.gates.max_file_bytes,
            alpha_threshold: self.cfg.align.alpha_threshold,
        }
    }
}

/// Verdict on one candidate.
#[derive(Clone, Debug)]
pub struct AuditReport {
    pub outcome: AttemptOutcome,
    pub reasons: Vec<ReasonCode>,
    /// Composite value; `None` after a hard failure.
    pub composite: Option<f64>,
    /// Aligned candidate, present whenever the hard gates passed.
    pub aligned: Option<RgbaFrame>,
    pub metrics: AttemptMetrics,
}

/// Runs hard gates, alignment, the soft metric suite and the composite scorer over `bytes`.
///
/// Quality failures are reported through [`AuditReport::reasons`]; `Err` means the audit itself
/// could not run.
#[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
pub fn audit_candidate(bytes: &[u8], ctx: &AuditContext<'_>) -> SpriteGateResult<AuditReport> {
    let cfg = ctx.cfg;
    let pass = match evaluate_hard_gates(bytes, &ctx.hard_gate_opts()) {
        Ok(pass) => pass,
        Err(failure) => {
            tracing::info!(gate = failure.gate.name(), code = %failure.code, "hard gate failed");
            return Ok(AuditReport {
                outcome: AttemptOutcome::HardFail,
                reasons: vec![failure.code],
                composite: None,
                aligned: None,
                metrics: AttemptMetrics {
                    gate_checks: failure.checks.clone(),
                    hard_failure: Some(HardFailureSummary::from(&failure)),
                    ..AttemptMetrics::default()
                },
            });
        }
    };

    let aligned = align(&pass.frame, ctx.anchor, &cfg.align)?;
    let soft = run_soft_metrics(
        SuiteInput {
            candidate: &aligned.frame,
            anchor: ctx.anchor_frame,
            previous: ctx.previous,
        },
        cfg,
    )?;
    let inputs = CategoryInputs::from_metrics(&soft, &aligned.alignment, &cfg.thresholds);
    let score = composite(&inputs, &cfg.weights, cfg.thresholds.composite_min)?;

    let t = &cfg.thresholds;
    let mut reasons = Vec::new();
    if soft.identity.score < t.identity_min {
        reasons.push(ReasonCode::IdentityDrift);
    }
    if !soft.palette.skipped && soft.palette.score < t.palette_min {
        reasons.push(ReasonCode::PaletteDrift);
    }
    if soft.orphans.class == OrphanClass::Fail {
        reasons.push(ReasonCode::OrphanNoise);
    }
    if soft.temporal.failed() {
        reasons.push(ReasonCode::TemporalFlicker);
    }
    if aligned.alignment.residual_px > t.baseline_tolerance_px {
        reasons.push(ReasonCode::BaselineDrift);
    }
    if !score.passed {
        reasons.push(ReasonCode::CompositeBelowMinimum);
    }

    let outcome = if reasons.is_empty() {
        AttemptOutcome::Passed
    } else {
        AttemptOutcome::SoftFail
    };
    tracing::debug!(
        identity = soft.identity.score,
        palette = soft.palette.score,
        orphans = soft.orphans.count,
        composite = score.value,
        ?outcome,
        "candidate audited"
    );

    Ok(AuditReport {
        outcome,
        reasons,
        composite: Some(score.value),
        aligned: Some(aligned.frame),
        metrics: AttemptMetrics {
            gate_checks: pass.checks,
            alignment: Some(aligned.alignment),
            soft: Some(soft),
            composite: Some(score),
            ..AttemptMetrics::default()
        },
    })
}

#[cfg(test)]
#[path = "../../tests/unit/engine/auditor.rs"]
mod tests;
