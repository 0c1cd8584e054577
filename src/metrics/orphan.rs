use crate::foundation::core::RgbaFrame;

/// Maximum number of orphan positions kept for diagnostics.
pub const MAX_REPORTED_POSITIONS: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanClass {
    Pass,
    Warning,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrphanReport {
    pub count: u32,
    pub class: OrphanClass,
    /// First orphans in scan order, capped at [`MAX_REPORTED_POSITIONS`].
    pub positions: Vec<(u32, u32)>,
}

/// Counts opaque interior pixels with no 4-neighbor of identical RGBA.
///
/// Border pixels are never counted. `pass_max` and `warn_max` are inclusive upper bounds of the
/// pass and warning classes.
pub fn orphan_pixels(frame: &RgbaFrame, pass_max: u32, warn_max: u32) -> OrphanReport {
    let (w, h) = (frame.width as usize, frame.height as usize);
    let mut count = 0u32;
    let mut positions = Vec::new();

    if w >= 3 && h >= 3 {
        let stride = w * 4;
        let data = &frame.data;
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let i = y * stride + x * 4;
                if data[i + 3] == 0 {
                    continue;
                }
                let px = &data[i..i + 4];
                let neighbors = [i - 4, i + 4, i - stride, i + stride];
                if neighbors.iter().any(|&n| &data[n..n + 4] == px) {
                    continue;
                }
                count += 1;
                if positions.len() < MAX_REPORTED_POSITIONS {
                    positions.push((x as u32, y as u32));
                }
            }
        }
    }

    let class = if count <= pass_max {
        OrphanClass::Pass
    } else if count <= warn_max {
        OrphanClass::Warning
    } else {
        OrphanClass::Fail
    };
    OrphanReport {
        count,
        class,
        positions,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/metrics/orphan.rs"]
mod tests;
