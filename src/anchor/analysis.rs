use crate::foundation::core::{PixelRect, RgbaFrame};
use crate::foundation::error::{SpriteGateError, SpriteGateResult};

/// Spatial reference points of a sprite frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnchorAnalysis {
    /// Lowest row holding a visible pixel (ground contact line).
    pub baseline_y: u32,
    /// Highest row holding a visible pixel.
    pub top_y: u32,
    /// Mean X of visible pixels inside the root zone.
    pub root_x: f64,
    /// Bounding box of all visible pixels.
    pub bounds: PixelRect,
    /// Canvas width of the analyzed frame.
    pub width: u32,
    /// Canvas height of the analyzed frame.
    pub height: u32,
}

impl AnchorAnalysis {
    /// Alias of `baseline_y`, as seen on a candidate frame.
    pub fn bottom_y(&self) -> u32 {
        self.baseline_y
    }
}

/// Parameters of the visible-pixel scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalyzeOpts {
    pub alpha_threshold: u8,
    pub root_zone_ratio: f64,
}

impl Default for AnalyzeOpts {
    fn default() -> Self {
        Self {
            alpha_threshold: 128,
            root_zone_ratio: 0.15,
        }
    }
}

/// Locate the baseline, vertical extent, bounding box and root-zone centroid of `frame`.
///
/// A pixel is visible when its alpha is `>= alpha_threshold`. The root zone is the band
/// `[bottom_y - (bottom_y - top_y) * root_zone_ratio, bottom_y]`.
pub fn analyze(frame: &RgbaFrame, opts: AnalyzeOpts) -> SpriteGateResult<AnchorAnalysis> {
    if !(0.05..=0.50).contains(&opts.root_zone_ratio) {
        return Err(SpriteGateError::validation(
            "root_zone_ratio must be within 0.05..=0.50",
        ));
    }
    if frame.width == 0 || frame.height == 0 {
        return Err(SpriteGateError::validation("cannot analyze an empty frame"));
    }
    let threshold = opts.alpha_threshold;
    let w = frame.width as usize;

    let mut top: Option<u32> = None;
    let mut bottom = 0u32;
    let mut min_x = u32::MAX;
    let mut max_x = 0u32;
    for (y, row) in frame.data.chunks_exact(w * 4).enumerate() {
        let mut row_visible = false;
        for (x, px) in row.chunks_exact(4).enumerate() {
            if px[3] >= threshold {
                row_visible = true;
                min_x = min_x.min(x as u32);
                max_x = max_x.max(x as u32);
            }
        }
        if row_visible {
            top.get_or_insert(y as u32);
            bottom = y as u32;
        }
    }
    let Some(top_y) = top else {
        return Err(SpriteGateError::AnchorFullyTransparent { threshold });
    };

    let zone_height = f64::from(bottom - top_y) * opts.root_zone_ratio;
    let zone_top = (f64::from(bottom) - zone_height).ceil().max(f64::from(top_y)) as u32;

    let mut sum_x = 0u64;
    let mut count = 0u64;
    for y in zone_top..=bottom {
        let row_start = frame.offset(0, y);
        let row = &frame.data[row_start..row_start + w * 4];
        for (x, px) in row.chunks_exact(4).enumerate() {
            if px[3] >= threshold {
                sum_x += x as u64;
                count += 1;
            }
        }
    }
    // The baseline row always holds a visible pixel, so `count > 0`.
    let root_x = sum_x as f64 / count.max(1) as f64;

    Ok(AnchorAnalysis {
        baseline_y: bottom,
        top_y,
        root_x,
        bounds: PixelRect {
            x0: min_x,
            y0: top_y,
            x1: max_x,
            y1: bottom,
        },
        width: frame.width,
        height: frame.height,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/anchor/analysis.rs"]
mod tests;
