use std::collections::HashMap;

use crate::anchor::chroma::rgb_distance_sq;
use crate::foundation::core::{Rgb, RgbaFrame};
use crate::foundation::math::ratio;

/// How many off-palette colors the report keeps.
pub const TOP_OFF_PALETTE: usize = 8;

/// Share of opaque pixels closest to one palette entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PaletteCoverage {
    pub color: Rgb,
    /// Matched pixels whose nearest palette color is `color`.
    pub pixels: u64,
    /// `pixels / opaque_pixels`.
    pub share: f64,
}

/// Frequent color that matched no palette entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OffPaletteColor {
    pub color: Rgb,
    pub pixels: u64,
    pub nearest: Rgb,
    pub distance: f64,
}

/// Palette fidelity result.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PaletteReport {
    /// `matched / opaque`, or `1.0` when skipped.
    pub score: f64,
    pub matched_pixels: u64,
    pub opaque_pixels: u64,
    /// True when no palette was configured.
    pub skipped: bool,
    pub coverage: Vec<PaletteCoverage>,
    pub top_off_palette: Vec<OffPaletteColor>,
}

impl PaletteReport {
    fn skipped() -> Self {
        Self {
            score: 1.0,
            matched_pixels: 0,
            opaque_pixels: 0,
            skipped: true,
            coverage: Vec::new(),
            top_off_palette: Vec::new(),
        }
    }
}

/// Fraction of opaque pixels within `tolerance` (Euclidean RGB) of their nearest palette color.
///
/// An empty palette skips the check with a neutral score of `1.0`. A frame without opaque
/// pixels also scores `1.0`; the hard gates reject those before this runs.
pub fn palette_fidelity(frame: &RgbaFrame, palette: &[Rgb], tolerance: f64) -> PaletteReport {
    if palette.is_empty() {
        return PaletteReport::skipped();
    }
    let tol_sq = tolerance * tolerance;

    // Sprites use few distinct colors; resolve each one once.
    let mut distinct: HashMap<Rgb, u64> = HashMap::new();
    for px in frame.data.chunks_exact(4) {
        if px[3] > 0 {
            *distinct.entry([px[0], px[1], px[2]]).or_default() += 1;
        }
    }
    let opaque: u64 = distinct.values().sum();
    if opaque == 0 {
        return PaletteReport {
            score: 1.0,
            matched_pixels: 0,
            opaque_pixels: 0,
            skipped: false,
            coverage: zero_coverage(palette),
            top_off_palette: Vec::new(),
        };
    }

    let mut per_entry = vec![0u64; palette.len()];
    let mut matched = 0u64;
    let mut off: Vec<OffPaletteColor> = Vec::new();
    for (color, count) in distinct {
        let (idx, dist_sq) = nearest(palette, color);
        if dist_sq < tol_sq {
            matched += count;
            per_entry[idx] += count;
        } else {
            off.push(OffPaletteColor {
                color,
                pixels: count,
                nearest: palette[idx],
                distance: dist_sq.sqrt(),
            });
        }
    }

    off.sort_by(|a, b| b.pixels.cmp(&a.pixels).then(a.color.cmp(&b.color)));
    off.truncate(TOP_OFF_PALETTE);

    let coverage = palette
        .iter()
        .zip(per_entry)
        .map(|(color, pixels)| PaletteCoverage {
            color: *color,
            pixels,
            share: ratio(pixels as usize, opaque as usize),
        })
        .collect();

    PaletteReport {
        score: ratio(matched as usize, opaque as usize),
        matched_pixels: matched,
        opaque_pixels: opaque,
        skipped: false,
        coverage,
        top_off_palette: off,
    }
}

fn nearest(palette: &[Rgb], color: Rgb) -> (usize, f64) {
    let mut best = (0usize, f64::INFINITY);
    for (i, p) in palette.iter().enumerate() {
        let d = rgb_distance_sq(*p, color);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn zero_coverage(palette: &[Rgb]) -> Vec<PaletteCoverage> {
    palette
        .iter()
        .map(|color| PaletteCoverage {
            color: *color,
            pixels: 0,
            share: 0.0,
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/metrics/palette.rs"]
mod tests;
