use std::{collections::BTreeMap, path::Path};

use anyhow::Context;

use crate::foundation::core::Rgb;
use crate::foundation::error::{SpriteGateError, SpriteGateResult};

/// Manifest-derived audit configuration.
///
/// Every section has defaults, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Structural hard-gate limits.
    pub gates: GateConfig,
    /// Contact-patch alignment parameters.
    pub align: AlignConfig,
    /// Per-metric pass thresholds.
    pub thresholds: ThresholdConfig,
    /// Composite category weights.
    pub weights: WeightConfig,
    /// Structural similarity parameters.
    pub ssim: SsimConfig,
    /// Orphan-pixel classification limits.
    pub orphan: OrphanConfig,
    /// Move-type keyed temporal coherence table.
    pub temporal: TemporalConfig,
    /// Retry and stop-condition limits.
    pub retry: RetryConfig,
    /// Allowed palette colors. Empty disables the palette check.
    pub palette: Vec<Rgb>,
    /// Move type of the animation being generated (e.g. `idle`, `walk`, `attack`).
    pub move_type: String,
}

/// Hard-gate limits.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Expected canvas size; `None` means "same as the anchor". When set it must equal the
    /// anchor's size, see [`AuditConfig::check_anchor_size`].
    pub expected_size: Option<(u32, u32)>,
    /// Smallest accepted encoded file size in bytes.
    pub min_file_bytes: u64,
    /// Largest accepted encoded file size in bytes.
    pub max_file_bytes: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            expected_size: None,
            min_file_bytes: 64,
            max_file_bytes: 8 * 1024 * 1024,
        }
    }
}

/// How candidates are spatially aligned to the anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    /// Match the root-zone centroid and baseline of the anchor.
    #[default]
    ContactPatch,
    /// Legacy bounding-box centering. Causes sliding on asymmetric poses.
    Center,
    /// Leave candidates untouched.
    None,
}

/// Alignment parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    pub mode: AlignMode,
    /// Minimum alpha for a pixel to count as visible.
    pub alpha_threshold: u8,
    /// Height of the root zone as a fraction of the visible height (0.05..=0.50).
    pub root_zone_ratio: f64,
    /// Largest horizontal correction in pixels; larger offsets are clamped.
    pub max_shift_x: u32,
    /// Largest vertical correction in pixels; larger offsets are clamped.
    pub max_shift_y: u32,
    /// Also snap the candidate's baseline to the anchor's.
    pub lock_vertical: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            mode: AlignMode::ContactPatch,
            alpha_threshold: 128,
            root_zone_ratio: 0.15,
            max_shift_x: 32,
            max_shift_y: 32,
            lock_vertical: true,
        }
    }
}

/// Per-metric thresholds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Minimum SSIM against the anchor.
    pub identity_min: f64,
    /// Minimum fraction of opaque pixels matching the palette.
    pub palette_min: f64,
    /// Euclidean RGB distance under which a pixel matches a palette color.
    pub palette_tolerance: f64,
    /// Minimum weighted composite score.
    pub composite_min: f64,
    /// Largest contact-point error (pixels) left after alignment.
    pub baseline_tolerance_px: f64,
    /// Orphan count at which the style category reaches zero.
    pub style_orphan_ceiling: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            identity_min: 0.85,
            palette_min: 0.90,
            palette_tolerance: 30.0,
            composite_min: 0.80,
            baseline_tolerance_px: 1.0,
            style_orphan_ceiling: 64,
        }
    }
}

/// Composite category weights. Normalized by their sum when scoring.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub stability: f64,
    pub identity: f64,
    pub palette: f64,
    pub style: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            stability: 0.35,
            identity: 0.30,
            palette: 0.20,
            style: 0.15,
        }
    }
}

impl WeightConfig {
    pub fn sum(&self) -> f64 {
        self.stability + self.identity + self.palette + self.style
    }
}

/// Structural similarity parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SsimConfig {
    /// Window edge length in pixels (odd).
    pub window: u32,
    /// Gaussian sigma of the window weights.
    pub sigma: f64,
    /// Weight of the mean RGB similarity.
    pub rgb_weight: f64,
    /// Weight of the alpha similarity.
    pub alpha_weight: f64,
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            window: 11,
            sigma: 1.5,
            rgb_weight: 0.8,
            alpha_weight: 0.2,
        }
    }
}

/// Orphan-pixel classification limits (inclusive upper bounds).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrphanConfig {
    /// Counts up to this value pass silently.
    pub pass_max: u32,
    /// Counts up to this value log a warning; above it the candidate soft-fails.
    pub warn_max: u32,
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            pass_max: 5,
            warn_max: 15,
        }
    }
}

/// Temporal coherence rule for one move type.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalRule {
    /// Fail when the normalized delta exceeds this value.
    Threshold(f64),
    /// Skip the temporal check; identity carries the frame instead.
    Bypass,
}

/// Move-type keyed temporal thresholds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Rule per lowercase move type.
    pub moves: BTreeMap<String, TemporalRule>,
    /// Threshold for move types missing from `moves`.
    pub default_threshold: f64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        let moves = [
            ("idle", TemporalRule::Threshold(0.05)),
            ("walk", TemporalRule::Threshold(0.12)),
            ("run", TemporalRule::Threshold(0.18)),
            ("crouch", TemporalRule::Threshold(0.10)),
            ("hurt", TemporalRule::Threshold(0.20)),
            ("attack", TemporalRule::Bypass),
            ("jump", TemporalRule::Bypass),
            ("special", TemporalRule::Bypass),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            moves,
            default_threshold: 0.05,
        }
    }
}

impl TemporalConfig {
    /// Rule for `move_type`; unknown types get the strict default threshold.
    pub fn rule_for(&self, move_type: &str) -> (TemporalRule, bool) {
        match self.moves.get(&move_type.to_ascii_lowercase()) {
            Some(rule) => (*rule, true),
            None => (TemporalRule::Threshold(self.default_threshold), false),
        }
    }
}

/// Retry and stop-condition limits.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts_per_frame: u32,
    /// Consecutive rejected/failed frames that halt the run.
    pub max_consecutive_fails: u32,
    /// `(rejected + failed) / attempted` at which the run halts.
    pub max_reject_rate: f64,
    /// `frames needing more than one attempt / attempted` at which the run halts.
    pub max_retry_rate: f64,
    /// Terminal frames required before rate conditions are evaluated.
    pub min_frames_for_rates: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_frame: 5,
            max_consecutive_fails: 5,
            max_reject_rate: 0.5,
            max_retry_rate: 0.2,
            min_frames_for_rates: 4,
        }
    }
}

impl AuditConfig {
    pub fn from_json_str(s: &str) -> SpriteGateResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> SpriteGateResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read audit config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> SpriteGateResult<()> {
        let a = &self.align;
        if !(0.05..=0.50).contains(&a.root_zone_ratio) {
            return Err(SpriteGateError::validation(
                "align.root_zone_ratio must be within 0.05..=0.50",
            ));
        }
        if a.alpha_threshold == 0 {
            return Err(SpriteGateError::validation(
                "align.alpha_threshold must be > 0",
            ));
        }

        let g = &self.gates;
        if g.min_file_bytes > g.max_file_bytes {
            return Err(SpriteGateError::validation(
                "gates.min_file_bytes must be <= gates.max_file_bytes",
            ));
        }
        if let Some((w, h)) = g.expected_size
            && (w == 0 || h == 0)
        {
            return Err(SpriteGateError::validation(
                "gates.expected_size must be non-zero",
            ));
        }

        let s = &self.ssim;
        if s.window < 3 || s.window % 2 == 0 {
            return Err(SpriteGateError::validation(
                "ssim.window must be odd and >= 3",
            ));
        }
        if !s.sigma.is_finite() || s.sigma <= 0.0 {
            return Err(SpriteGateError::validation("ssim.sigma must be > 0"));
        }
        if s.rgb_weight < 0.0 || s.alpha_weight < 0.0 || s.rgb_weight + s.alpha_weight <= 0.0 {
            return Err(SpriteGateError::validation(
                "ssim channel weights must be non-negative with a positive sum",
            ));
        }

        let w = &self.weights;
        if [w.stability, w.identity, w.palette, w.style]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
            || w.sum() <= 0.0
        {
            return Err(SpriteGateError::validation(
                "weights must be non-negative with a positive sum",
            ));
        }

        let t = &self.thresholds;
        for (name, v) in [
            ("thresholds.identity_min", t.identity_min),
            ("thresholds.palette_min", t.palette_min),
            ("thresholds.composite_min", t.composite_min),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(SpriteGateError::validation(format!(
                    "{name} must be within 0..=1"
                )));
            }
        }
        if t.palette_tolerance < 0.0 || t.baseline_tolerance_px < 0.0 {
            return Err(SpriteGateError::validation(
                "palette_tolerance and baseline_tolerance_px must be >= 0",
            ));
        }
        if t.style_orphan_ceiling == 0 {
            return Err(SpriteGateError::validation(
                "thresholds.style_orphan_ceiling must be > 0",
            ));
        }

        if self.orphan.pass_max > self.orphan.warn_max {
            return Err(SpriteGateError::validation(
                "orphan.pass_max must be <= orphan.warn_max",
            ));
        }

        for (name, rule) in &self.temporal.moves {
            if let TemporalRule::Threshold(v) = rule
                && !(*v > 0.0 && *v <= 1.0)
            {
                return Err(SpriteGateError::validation(format!(
                    "temporal threshold for '{name}' must be within (0, 1]"
                )));
            }
        }
        if !(self.temporal.default_threshold > 0.0 && self.temporal.default_threshold <= 1.0) {
            return Err(SpriteGateError::validation(
                "temporal.default_threshold must be within (0, 1]",
            ));
        }

        let r = &self.retry;
        if r.max_attempts_per_frame == 0 {
            return Err(SpriteGateError::validation(
                "retry.max_attempts_per_frame must be >= 1",
            ));
        }
        if r.max_consecutive_fails == 0 {
            return Err(SpriteGateError::validation(
                "retry.max_consecutive_fails must be >= 1",
            ));
        }
        for (name, v) in [
            ("retry.max_reject_rate", r.max_reject_rate),
            ("retry.max_retry_rate", r.max_retry_rate),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(SpriteGateError::validation(format!(
                    "{name} must be within 0..=1"
                )));
            }
        }
        Ok(())
    }

    /// Errors when `gates.expected_size` is set to anything other than the anchor canvas.
    pub fn check_anchor_size(&self, width: u32, height: u32) -> SpriteGateResult<()> {
        match self.gates.expected_size {
            Some((w, h)) if (w, h) != (width, height) => Err(SpriteGateError::validation(format!(
                "gates.expected_size {w}x{h} does not match the {width}x{height} anchor"
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/audit.rs"]
mod tests;
