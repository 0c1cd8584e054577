use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::foundation::core::FrameIndex;
use crate::foundation::error::SpriteGateResult;
use crate::foundation::math::ratio;
use crate::gates::reason::ReasonCode;
use crate::report::redact::redact;
use crate::retry::ladder::Strategy;
use crate::retry::stop::StopReason;
use crate::state::model::{FrameStatus, RunState};
use crate::state::store::{RunLayout, write_json_atomic};

/// How many failure codes the diagnostic lists.
pub const TOP_FAILURES: usize = 5;
/// Example frames kept per failure code.
pub const EXAMPLE_FRAMES: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameBreakdown {
    pub total: u32,
    pub approved: u32,
    pub rejected: u32,
    pub failed: u32,
    /// Frames that never reached a terminal status.
    pub open: u32,
}

/// One frame as it stood when the run halted.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameDiagnostic {
    pub index: FrameIndex,
    pub status: FrameStatus,
    pub attempts: u32,
    /// Terminal reasons; empty for approved and open frames.
    pub reasons: Vec<ReasonCode>,
    /// Composite of the latest attempt, `None` if it never reached scoring.
    pub last_composite: Option<f64>,
    /// Strategy of every attempt, in attempt order.
    pub strategies: Vec<Strategy>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FailureCodeSummary {
    pub code: ReasonCode,
    /// Attempts that reported this code.
    pub occurrences: u32,
    pub example_frames: Vec<FrameIndex>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RootCause {
    pub summary: String,
    pub suggestion: String,
    pub confidence: Confidence,
    /// Share of all failure occurrences carried by the dominant code.
    pub dominant_share: f64,
}

/// Contents of `diagnostic.json`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub stop_reason: Option<StopReason>,
    pub total_attempts: u32,
    pub frames: FrameBreakdown,
    /// Frame-by-frame breakdown, in frame order.
    pub per_frame: Vec<FrameDiagnostic>,
    pub top_failures: Vec<FailureCodeSummary>,
    pub root_cause: RootCause,
}

impl Diagnostic {
    pub fn write(&self, layout: &RunLayout) -> SpriteGateResult<()> {
        write_json_atomic(&layout.diagnostic(), self)
    }
}

/// Post-halt analysis of a run: frame breakdown, dominant failure codes and a root-cause guess.
pub fn diagnose(state: &RunState, now: DateTime<Utc>) -> Diagnostic {
    let mut frames = FrameBreakdown {
        total: state.frames.len() as u32,
        ..FrameBreakdown::default()
    };
    let mut counts: BTreeMap<ReasonCode, (u32, BTreeSet<FrameIndex>)> = BTreeMap::new();
    let mut per_frame = Vec::with_capacity(state.frames.len());
    for f in &state.frames {
        per_frame.push(FrameDiagnostic {
            index: f.index,
            status: f.status,
            attempts: f.attempt_count(),
            reasons: f.reasons.clone(),
            last_composite: f.last_attempt().and_then(|a| a.composite),
            strategies: f.attempts.iter().map(|a| a.strategy).collect(),
        });
        match f.status {
            FrameStatus::Approved => frames.approved += 1,
            FrameStatus::Rejected => frames.rejected += 1,
            FrameStatus::Failed => frames.failed += 1,
            _ => frames.open += 1,
        }
        for a in &f.attempts {
            for code in &a.reasons {
                let entry = counts.entry(*code).or_default();
                entry.0 += 1;
                entry.1.insert(f.index);
            }
        }
    }

    let total_occurrences: u32 = counts.values().map(|(n, _)| *n).sum();
    let mut ranked: Vec<FailureCodeSummary> = counts
        .into_iter()
        .map(|(code, (occurrences, frames))| FailureCodeSummary {
            code,
            occurrences,
            example_frames: frames.into_iter().take(EXAMPLE_FRAMES).collect(),
        })
        .collect();
    // Stable sort keeps code order for ties.
    ranked.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    ranked.truncate(TOP_FAILURES);

    let root_cause = match ranked.first() {
        Some(top) => root_cause_for(
            top.code,
            ratio(top.occurrences as usize, total_occurrences as usize),
        ),
        None => RootCause {
            summary: "no failing attempts were recorded".to_owned(),
            suggestion: "inspect the stop reason; the run halted on limits alone".to_owned(),
            confidence: Confidence::Low,
            dominant_share: 0.0,
        },
    };

    let stop_reason = state.stop_reason.clone().map(|mut r| {
        r.message = redact(&r.message);
        r
    });

    Diagnostic {
        run_id: state.run_id.clone(),
        generated_at: now,
        stop_reason,
        total_attempts: state.total_attempts,
        frames,
        per_frame,
        top_failures: ranked,
        root_cause,
    }
}

fn confidence(share: f64) -> Confidence {
    if share >= 0.6 {
        Confidence::High
    } else if share >= 0.35 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn root_cause_for(code: ReasonCode, share: f64) -> RootCause {
    use ReasonCode::*;
    let (summary, suggestion) = match code {
        DimensionMismatch | ColorDepthMismatch => (
            "the generation adapter returns images with the wrong canvas size or pixel format",
            "fix the adapter output settings; prompt changes cannot repair this",
        ),
        AdapterFailure => (
            "the generation service is failing or unreachable",
            "check service availability, quotas and credentials",
        ),
        NoAlphaChannel | FullyTransparent => (
            "generated images lack usable transparency",
            "request transparent output or enable chroma-key removal",
        ),
        Undecodable | FileSizeOutOfBounds => (
            "generated files are corrupt or truncated",
            "verify the adapter's download and encoding path",
        ),
        IdentityDrift => (
            "the character drifts away from the anchor design",
            "strengthen the identity reference or lower generation variation",
        ),
        PaletteDrift => (
            "generated colors leave the configured palette",
            "tighten palette constraints in the prompt or widen the palette tolerance",
        ),
        OrphanNoise => (
            "generated frames carry isolated noisy pixels",
            "request cleaner pixel art or add a post-process cleanup",
        ),
        TemporalFlicker => (
            "consecutive frames change more than the move type allows",
            "lock generation to the previous frame or review the move type",
        ),
        BaselineDrift => (
            "the character's ground contact moves beyond the alignment range",
            "raise the alignment shift limits or re-anchor the pose",
        ),
        CompositeBelowMinimum => (
            "frames pass individual checks but score low overall",
            "review category weights and the composite minimum",
        ),
        MaxAttemptsReached => (
            "frames exhaust their attempt budget",
            "raise max_attempts_per_frame or address the per-attempt failures",
        ),
    };
    RootCause {
        summary: format!("{code}: {summary}"),
        suggestion: suggestion.to_owned(),
        confidence: confidence(share),
        dominant_share: share,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/report/diagnostics.rs"]
mod tests;
