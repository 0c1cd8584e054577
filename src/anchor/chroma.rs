use std::collections::HashMap;

use crate::foundation::core::{Rgb, RgbaFrame};

/// Chroma-key candidates in preference order.
pub const DEFAULT_CHROMA_CANDIDATES: [Rgb; 5] = [
    [255, 0, 255],
    [0, 255, 0],
    [0, 255, 255],
    [0, 0, 255],
    [255, 255, 0],
];

/// Distinct visible colors of `frame`, most frequent first, capped at `max_colors`.
///
/// Ties are broken by color value so the result is deterministic.
pub fn extract_palette(frame: &RgbaFrame, alpha_threshold: u8, max_colors: usize) -> Vec<Rgb> {
    let mut counts: HashMap<Rgb, u32> = HashMap::new();
    for px in frame.data.chunks_exact(4) {
        if px[3] >= alpha_threshold {
            *counts.entry([px[0], px[1], px[2]]).or_default() += 1;
        }
    }
    let mut colors: Vec<(Rgb, u32)> = counts.into_iter().collect();
    colors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    colors.into_iter().take(max_colors).map(|(c, _)| c).collect()
}

/// True if any palette color lies strictly closer than `tolerance` (Euclidean RGB) to `color`.
///
/// Same boundary as the palette fidelity metric: a color exactly `tolerance` away is off-palette.
pub fn palette_contains(palette: &[Rgb], color: Rgb, tolerance: f64) -> bool {
    let tol_sq = tolerance * tolerance;
    palette.iter().any(|p| rgb_distance_sq(*p, color) < tol_sq)
}

/// First candidate that does not collide with the anchor palette.
///
/// Returns `None` when every candidate conflicts; callers then fall back to a native alpha
/// background.
pub fn select_chroma_key(anchor_palette: &[Rgb], candidates: &[Rgb], tolerance: f64) -> Option<Rgb> {
    candidates
        .iter()
        .copied()
        .find(|c| !palette_contains(anchor_palette, *c, tolerance))
}

#[inline]
pub(crate) fn rgb_distance_sq(a: Rgb, b: Rgb) -> f64 {
    let dr = f64::from(a[0]) - f64::from(b[0]);
    let dg = f64::from(a[1]) - f64::from(b[1]);
    let db = f64::from(a[2]) - f64::from(b[2]);
    dr * dr + dg * dg + db * db
}

#[cfg(test)]
#[path = "../../tests/unit/anchor/chroma.rs"]
mod tests;
