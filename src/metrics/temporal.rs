use crate::config::audit::{TemporalConfig, TemporalRule};
use crate::foundation::core::RgbaFrame;
use crate::foundation::error::{SpriteGateError, SpriteGateResult};

/// Result of the temporal coherence check against the previous approved frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalOutcome {
    Evaluated {
        delta: f64,
        threshold: f64,
        passed: bool,
        overlap_pixels: u64,
    },
    /// The move type expects large frame-to-frame change.
    Bypassed { move_type: String },
    /// No previous approved frame exists.
    NotApplicable,
}

impl TemporalOutcome {
    pub fn failed(&self) -> bool {
        matches!(self, Self::Evaluated { passed: false, .. })
    }

    /// Score contribution to the stability category, `None` when not evaluated.
    pub fn stability_score(&self) -> Option<f64> {
        match self {
            Self::Evaluated {
                delta, threshold, ..
            } => {
                if *threshold <= 0.0 {
                    return Some(if *delta <= 0.0 { 1.0 } else { 0.0 });
                }
                Some((1.0 - delta / (2.0 * threshold)).clamp(0.0, 1.0))
            }
            Self::Bypassed { .. } | Self::NotApplicable => None,
        }
    }
}

/// Mean absolute RGB difference over pixels opaque in both frames, normalized to [0, 1].
///
/// Returns `(delta, overlap)`. Frames without any shared opaque pixel are maximally different.
pub fn temporal_delta(current: &RgbaFrame, previous: &RgbaFrame) -> SpriteGateResult<(f64, u64)> {
    if !current.same_size(previous) {
        return Err(SpriteGateError::validation(format!(
            "temporal delta needs equal sizes, got {}x{} and {}x{}",
            current.width, current.height, previous.width, previous.height
        )));
    }
    let mut sum = 0u64;
    let mut overlap = 0u64;
    for (a, b) in current.data.chunks_exact(4).zip(previous.data.chunks_exact(4)) {
        if a[3] == 0 || b[3] == 0 {
            continue;
        }
        overlap += 1;
        for c in 0..3 {
            sum += u64::from(a[c].abs_diff(b[c]));
        }
    }
    if overlap == 0 {
        return Ok((1.0, 0));
    }
    Ok((sum as f64 / (overlap as f64 * 3.0 * 255.0), overlap))
}

/// Applies the move-type table to `current` against an optional previous approved frame.
pub fn temporal_coherence(
    current: &RgbaFrame,
    previous: Option<&RgbaFrame>,
    move_type: &str,
    cfg: &TemporalConfig,
) -> SpriteGateResult<TemporalOutcome> {
    let Some(previous) = previous else {
        return Ok(TemporalOutcome::NotApplicable);
    };
    let (rule, known) = cfg.rule_for(move_type);
    let threshold = match rule {
        TemporalRule::Bypass => {
            tracing::info!(move_type, "temporal coherence bypassed");
            return Ok(TemporalOutcome::Bypassed {
                move_type: move_type.to_owned(),
            });
        }
        TemporalRule::Threshold(t) => t,
    };
    if !known {
        tracing::debug!(move_type, threshold, "unknown move type, using strict threshold");
    }
    let (delta, overlap_pixels) = temporal_delta(current, previous)?;
    Ok(TemporalOutcome::Evaluated {
        delta,
        threshold,
        passed: delta <= threshold,
        overlap_pixels,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/metrics/temporal.rs"]
mod tests;
