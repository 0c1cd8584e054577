use super::*;

fn lcg(seed: &mut u64) -> u8 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*seed >> 56) as u8
}

fn sprite(seed: u64, w: u32, h: u32) -> RgbaFrame {
    let mut s = seed;
    let mut f = RgbaFrame::transparent(w, h);
    for y in h / 4..h - h / 8 {
        for x in w / 4..w - w / 4 {
            let v = lcg(&mut s);
            f.set_pixel(x, y, [v, v / 2, 255 - v, 255]);
        }
    }
    f
}

#[test]
fn identical_images_score_one() {
    let a = sprite(7, 48, 48);
    let r = ssim(&a, &a, &SsimOpts::default()).unwrap();
    assert!((r.score - 1.0).abs() < 1e-9, "score {}", r.score);
    for c in r.channels {
        assert!((c - 1.0).abs() < 1e-9);
    }
    assert!(r.compared_pixels > 0);
}

#[test]
fn ssim_is_symmetric() {
    let a = sprite(1, 40, 40);
    let b = sprite(2, 40, 40);
    let ab = ssim(&a, &b, &SsimOpts::default()).unwrap();
    let ba = ssim(&b, &a, &SsimOpts::default()).unwrap();
    assert!((ab.score - ba.score).abs() < 1e-12);
    assert!(ab.score < 0.9);
}

#[test]
fn small_perturbation_scores_between_noise_and_identity() {
    let a = sprite(3, 48, 48);
    let mut b = a.clone();
    b.set_pixel(20, 20, [0, 0, 0, 255]);
    let noise = sprite(99, 48, 48);

    let near = ssim(&a, &b, &SsimOpts::default()).unwrap().score;
    let far = ssim(&a, &noise, &SsimOpts::default()).unwrap().score;
    assert!(near < 1.0);
    assert!(near > 0.95);
    assert!(far < near);
}

#[test]
fn invisible_color_noise_is_ignored() {
    let a = sprite(5, 32, 32);
    let mut b = a.clone();
    // Scribble over the fully transparent border only.
    for x in 0..32 {
        b.set_pixel(x, 0, [x as u8 * 7, 200, 13, 0]);
    }
    let r = ssim(&a, &b, &SsimOpts::default()).unwrap();
    assert!((r.score - 1.0).abs() < 1e-9);
}

#[test]
fn both_fully_transparent_is_neutral() {
    let a = RgbaFrame::transparent(16, 16);
    let r = ssim(&a, &a, &SsimOpts::default()).unwrap();
    assert_eq!(r.score, 1.0);
    assert_eq!(r.compared_pixels, 0);
}

#[test]
fn silhouette_mismatch_lowers_alpha_channel() {
    let a = RgbaFrame::filled(24, 24, [100, 100, 100, 255]);
    let mut b = a.clone();
    for y in 0..12 {
        for x in 0..24 {
            b.set_pixel(x, y, [0, 0, 0, 0]);
        }
    }
    let r = ssim(&a, &b, &SsimOpts::default()).unwrap();
    assert!(r.channels[3] < 0.9);
    assert!(r.score < 0.9);
}

#[test]
fn rejects_mismatched_sizes_and_even_windows() {
    let a = RgbaFrame::transparent(8, 8);
    let b = RgbaFrame::transparent(8, 9);
    assert!(ssim(&a, &b, &SsimOpts::default()).is_err());

    let opts = SsimOpts {
        window: 10,
        ..SsimOpts::default()
    };
    assert!(ssim(&a, &a, &opts).is_err());
}
