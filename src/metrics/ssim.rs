use crate::foundation::core::RgbaFrame;
use crate::foundation::error::{SpriteGateError, SpriteGateResult};
use crate::foundation::math::clamp_unit;

const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Structural similarity parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SsimOpts {
    /// Window edge length (odd).
    pub window: u32,
    pub sigma: f64,
    pub rgb_weight: f64,
    pub alpha_weight: f64,
}

impl Default for SsimOpts {
    fn default() -> Self {
        Self {
            window: 11,
            sigma: 1.5,
            rgb_weight: 0.8,
            alpha_weight: 0.2,
        }
    }
}

/// Mask-aware SSIM result.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SsimReport {
    /// Weighted RGB/alpha similarity in [0, 1].
    pub score: f64,
    /// Mean SSIM per channel in R, G, B, A order (unclamped).
    pub channels: [f64; 4],
    /// Pixels visible in at least one of the two images.
    pub compared_pixels: u64,
}

/// Windowed structural similarity between two equally sized frames.
///
/// Pixels transparent in both frames are excluded from the local statistics and from the
/// average. RGB of a fully transparent pixel is treated as black so that invisible color noise
/// cannot influence the score. The combined score is
/// `(rgb_weight * mean(R, G, B) + alpha_weight * A) / (rgb_weight + alpha_weight)`, clamped to
/// [0, 1].
pub fn ssim(a: &RgbaFrame, b: &RgbaFrame, opts: &SsimOpts) -> SpriteGateResult<SsimReport> {
    if !a.same_size(b) {
        return Err(SpriteGateError::validation(format!(
            "ssim needs equal sizes, got {}x{} and {}x{}",
            a.width, a.height, b.width, b.height
        )));
    }
    if opts.window < 3 || opts.window % 2 == 0 {
        return Err(SpriteGateError::validation("ssim window must be odd and >= 3"));
    }
    let weight_sum = opts.rgb_weight + opts.alpha_weight;
    if weight_sum <= 0.0 {
        return Err(SpriteGateError::validation(
            "ssim channel weights must have a positive sum",
        ));
    }

    let (w, h) = (a.width as usize, a.height as usize);
    let n = w * h;
    let mask: Vec<f64> = a
        .data
        .chunks_exact(4)
        .zip(b.data.chunks_exact(4))
        .map(|(pa, pb)| if pa[3] > 0 || pb[3] > 0 { 1.0 } else { 0.0 })
        .collect();
    let compared = mask.iter().filter(|m| **m > 0.0).count();
    if compared == 0 {
        return Ok(SsimReport {
            score: 1.0,
            channels: [1.0; 4],
            compared_pixels: 0,
        });
    }

    let kernel = gaussian_kernel(opts.window, opts.sigma)?;
    let mut scratch = vec![0.0f64; n];
    let mask_sum = blur(&mask, &mut scratch, w, h, &kernel);

    let mut channels = [0.0f64; 4];
    for (c, out) in channels.iter_mut().enumerate() {
        let xs = channel_values(a, c);
        let ys = channel_values(b, c);

        let mut mx = vec![0.0f64; n];
        let mut my = vec![0.0f64; n];
        let mut mxx = vec![0.0f64; n];
        let mut myy = vec![0.0f64; n];
        let mut mxy = vec![0.0f64; n];
        for i in 0..n {
            let (m, x, y) = (mask[i], xs[i], ys[i]);
            mx[i] = m * x;
            my[i] = m * y;
            mxx[i] = m * x * x;
            myy[i] = m * y * y;
            mxy[i] = m * x * y;
        }
        let sx = blur(&mx, &mut scratch, w, h, &kernel);
        let sy = blur(&my, &mut scratch, w, h, &kernel);
        let sxx = blur(&mxx, &mut scratch, w, h, &kernel);
        let syy = blur(&myy, &mut scratch, w, h, &kernel);
        let sxy = blur(&mxy, &mut scratch, w, h, &kernel);

        let mut acc = 0.0f64;
        for i in 0..n {
            if mask[i] == 0.0 {
                continue;
            }
            let wsum = mask_sum[i];
            let mu_x = sx[i] / wsum;
            let mu_y = sy[i] / wsum;
            let var_x = sxx[i] / wsum - mu_x * mu_x;
            let var_y = syy[i] / wsum - mu_y * mu_y;
            let cov = sxy[i] / wsum - mu_x * mu_y;
            let num = (2.0 * mu_x * mu_y + C1) * (2.0 * cov + C2);
            let den = (mu_x * mu_x + mu_y * mu_y + C1) * (var_x + var_y + C2);
            acc += num / den;
        }
        *out = acc / compared as f64;
    }

    let rgb = (channels[0] + channels[1] + channels[2]) / 3.0;
    let score = clamp_unit((opts.rgb_weight * rgb + opts.alpha_weight * channels[3]) / weight_sum);
    Ok(SsimReport {
        score,
        channels,
        compared_pixels: compared as u64,
    })
}

fn channel_values(frame: &RgbaFrame, c: usize) -> Vec<f64> {
    frame
        .data
        .chunks_exact(4)
        .map(|px| {
            if c < 3 && px[3] == 0 {
                0.0
            } else {
                f64::from(px[c])
            }
        })
        .collect()
}

fn gaussian_kernel(window: u32, sigma: f64) -> SpriteGateResult<Vec<f64>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(SpriteGateError::validation("ssim sigma must be > 0"));
    }
    let r = (window / 2) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    for v in &mut weights {
        *v /= sum;
    }
    Ok(weights)
}

/// Separable blur with zero padding outside the frame.
fn blur(src: &[f64], tmp: &mut [f64], width: usize, height: usize, k: &[f64]) -> Vec<f64> {
    let radius = (k.len() / 2) as isize;
    let (w, h) = (width as isize, height as isize);

    for y in 0..h {
        let row = (y * w) as usize;
        for x in 0..w {
            let mut acc = 0.0;
            for (ki, &kw) in k.iter().enumerate() {
                let sx = x + ki as isize - radius;
                if sx >= 0 && sx < w {
                    acc += kw * src[row + sx as usize];
                }
            }
            tmp[row + x as usize] = acc;
        }
    }

    let mut out = vec![0.0f64; src.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (ki, &kw) in k.iter().enumerate() {
                let sy = y + ki as isize - radius;
                if sy >= 0 && sy < h {
                    acc += kw * tmp[(sy * w + x) as usize];
                }
            }
            out[(y * w + x) as usize] = acc;
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/metrics/ssim.rs"]
mod tests;
