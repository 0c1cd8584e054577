use crate::config::audit::AuditConfig;
use crate::foundation::core::RgbaFrame;
use crate::foundation::error::SpriteGateResult;
use crate::metrics::orphan::{OrphanClass, OrphanReport, orphan_pixels};
use crate::metrics::palette::{PaletteReport, palette_fidelity};
use crate::metrics::ssim::{SsimOpts, SsimReport, ssim};
use crate::metrics::temporal::{TemporalOutcome, temporal_coherence};

/// Every soft metric of one candidate, computed together.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SoftMetrics {
    pub identity: SsimReport,
    pub palette: PaletteReport,
    pub orphans: OrphanReport,
    pub temporal: TemporalOutcome,
}

/// Inputs shared by the soft metrics of one attempt.
#[derive(Clone, Copy, Debug)]
pub struct SuiteInput<'a> {
    /// Aligned candidate.
    pub candidate: &'a RgbaFrame,
    pub anchor: &'a RgbaFrame,
    /// Aligned image of the previous approved frame, if any.
    pub previous: Option<&'a RgbaFrame>,
}

impl From<&crate::config::audit::SsimConfig> for SsimOpts {
    fn from(c: &crate::config::audit::SsimConfig) -> Self {
        Self {
            window: c.window,
            sigma: c.sigma,
            rgb_weight: c.rgb_weight,
            alpha_weight: c.alpha_weight,
        }
    }
}

/// Runs identity, palette, orphan and temporal checks concurrently and waits for all of them.
pub fn run_soft_metrics(input: SuiteInput<'_>, cfg: &AuditConfig) -> SpriteGateResult<SoftMetrics> {
    let ssim_opts = SsimOpts::from(&cfg.ssim);

    let ((identity, palette), (orphans, temporal)) = rayon::join(
        || {
            rayon::join(
                || ssim(input.candidate, input.anchor, &ssim_opts),
                || {
                    palette_fidelity(
                        input.candidate,
                        &cfg.palette,
                        cfg.thresholds.palette_tolerance,
                    )
                },
            )
        },
        || {
            rayon::join(
                || orphan_pixels(input.candidate, cfg.orphan.pass_max, cfg.orphan.warn_max),
                || {
                    temporal_coherence(
                        input.candidate,
                        input.previous,
                        &cfg.move_type,
                        &cfg.temporal,
                    )
                },
            )
        },
    );

    if orphans.class == OrphanClass::Warning {
        tracing::warn!(
            count = orphans.count,
            warn_max = cfg.orphan.warn_max,
            "orphan pixel noise above pass limit"
        );
    }

    Ok(SoftMetrics {
        identity: identity?,
        palette,
        orphans,
        temporal: temporal?,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/metrics/suite.rs"]
mod tests;
