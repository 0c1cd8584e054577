use crate::anchor::analysis::{AnalyzeOpts, AnchorAnalysis, analyze};
use crate::config::audit::{AlignConfig, AlignMode};
use crate::foundation::core::RgbaFrame;
use crate::foundation::error::{SpriteGateError, SpriteGateResult};

/// What the aligner did to one candidate.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Alignment {
    pub mode: AlignMode,
    /// Applied horizontal shift (positive moves right).
    pub shift_x: i32,
    /// Applied vertical shift (positive moves down).
    pub shift_y: i32,
    /// Shift the aligner wanted before clamping.
    pub wanted_x: i32,
    pub wanted_y: i32,
    pub clamped: bool,
    /// Contact-point error left after alignment, in pixels.
    pub residual_px: f64,
}

/// Aligned candidate together with the alignment record.
#[derive(Clone, Debug, PartialEq)]
pub struct Aligned {
    pub frame: RgbaFrame,
    pub alignment: Alignment,
}

/// Shifts `candidate` so its contact point lands on the anchor's.
///
/// The candidate is analyzed with the anchor algorithm; the shift pads with transparent pixels
/// and crops the opposite edge, so dimensions are preserved and no pixel is blended.
pub fn align(
    candidate: &RgbaFrame,
    anchor: &AnchorAnalysis,
    cfg: &AlignConfig,
) -> SpriteGateResult<Aligned> {
    if candidate.width != anchor.width || candidate.height != anchor.height {
        return Err(SpriteGateError::validation(format!(
            "cannot align {}x{} candidate to {}x{} anchor",
            candidate.width, candidate.height, anchor.width, anchor.height
        )));
    }
    let opts = AnalyzeOpts {
        alpha_threshold: cfg.alpha_threshold,
        root_zone_ratio: cfg.root_zone_ratio,
    };
    let before = analyze(candidate, opts)?;

    let (wanted_x, wanted_y) = match cfg.mode {
        AlignMode::None => (0, 0),
        AlignMode::ContactPatch => (
            round_shift(anchor.root_x - before.root_x),
            vertical_shift(anchor, &before, cfg),
        ),
        AlignMode::Center => (
            round_shift(anchor.bounds.center_x() - before.bounds.center_x()),
            vertical_shift(anchor, &before, cfg),
        ),
    };

    let shift_x = clamp_shift(wanted_x, cfg.max_shift_x);
    let shift_y = clamp_shift(wanted_y, cfg.max_shift_y);
    let clamped = shift_x != wanted_x || shift_y != wanted_y;
    if clamped {
        tracing::warn!(
            wanted_x,
            wanted_y,
            shift_x,
            shift_y,
            max_shift_x = cfg.max_shift_x,
            max_shift_y = cfg.max_shift_y,
            "alignment shift clamped"
        );
    }

    let frame = if shift_x == 0 && shift_y == 0 {
        candidate.clone()
    } else {
        shift_frame(candidate, shift_x, shift_y)
    };

    let residual_px = match analyze(&frame, opts) {
        Ok(after) => contact_error(anchor, &after),
        // Everything visible was cropped away; fall back to the predicted position.
        Err(SpriteGateError::AnchorFullyTransparent { .. }) => predicted_error(
            anchor,
            &before,
            shift_x,
            shift_y,
        ),
        Err(e) => return Err(e),
    };

    Ok(Aligned {
        frame,
        alignment: Alignment {
            mode: cfg.mode,
            shift_x,
            shift_y,
            wanted_x,
            wanted_y,
            clamped,
            residual_px,
        },
    })
}

/// Moves every pixel of `frame` by `(dx, dy)`, filling uncovered pixels with transparency.
pub fn shift_frame(frame: &RgbaFrame, dx: i32, dy: i32) -> RgbaFrame {
    let mut out = RgbaFrame::transparent(frame.width, frame.height);
    let (w, h) = (i64::from(frame.width), i64::from(frame.height));
    let (dx, dy) = (i64::from(dx), i64::from(dy));
    if dx.abs() >= w || dy.abs() >= h {
        return out;
    }

    let src_x0 = (-dx).max(0);
    let dst_x0 = dx.max(0);
    let run = ((w - dx.abs()) * 4) as usize;
    for dst_y in 0..h {
        let src_y = dst_y - dy;
        if !(0..h).contains(&src_y) {
            continue;
        }
        let s = ((src_y * w + src_x0) * 4) as usize;
        let d = ((dst_y * w + dst_x0) * 4) as usize;
        out.data[d..d + run].copy_from_slice(&frame.data[s..s + run]);
    }
    out
}

fn vertical_shift(anchor: &AnchorAnalysis, candidate: &AnchorAnalysis, cfg: &AlignConfig) -> i32 {
    if !cfg.lock_vertical {
        return 0;
    }
    (i64::from(anchor.baseline_y) - i64::from(candidate.bottom_y())) as i32
}

fn round_shift(v: f64) -> i32 {
    v.round() as i32
}

fn clamp_shift(v: i32, max: u32) -> i32 {
    let max = i32::try_from(max).unwrap_or(i32::MAX);
    v.clamp(-max, max)
}

/// Larger of the baseline error and the root-x error beyond half a pixel.
fn contact_error(anchor: &AnchorAnalysis, candidate: &AnchorAnalysis) -> f64 {
    let dy = (f64::from(anchor.baseline_y) - f64::from(candidate.baseline_y)).abs();
    let dx = ((anchor.root_x - candidate.root_x).abs() - 0.5).max(0.0);
    dy.max(dx)
}

fn predicted_error(anchor: &AnchorAnalysis, before: &AnchorAnalysis, sx: i32, sy: i32) -> f64 {
    let dy = (f64::from(anchor.baseline_y) - (f64::from(before.baseline_y) + f64::from(sy))).abs();
    let dx = ((anchor.root_x - (before.root_x + f64::from(sx))).abs() - 0.5).max(0.0);
    dy.max(dx)
}

#[cfg(test)]
#[path = "../../tests/unit/align/contact_patch.rs"]
mod tests;
