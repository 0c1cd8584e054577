use std::io::Cursor;

use super::*;

fn opts(w: u32, h: u32) -> HardGateOpts {
    HardGateOpts {
        expected_width: w,
        expected_height: h,
        min_file_bytes: 1,
        max_file_bytes: 1 << 20,
        alpha_threshold: 128,
    }
}

fn encode(img: image::DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn sprite_png(w: u32, h: u32) -> Vec<u8> {
    let mut f = RgbaFrame::transparent(w, h);
    f.set_pixel(w / 2, h / 2, [255, 0, 0, 255]);
    f.encode_png().unwrap()
}

#[test]
fn valid_candidate_passes_all_gates_in_order() {
    let pass = evaluate_hard_gates(&sprite_png(16, 16), &opts(16, 16)).unwrap();
    assert_eq!(pass.frame.width, 16);
    let gates: Vec<HardGate> = pass.checks.iter().map(|c| c.gate).collect();
    assert_eq!(gates, HardGate::ORDER.to_vec());
    assert!(pass.checks.iter().all(|c| c.passed));
}

#[test]
fn file_size_fails_first_and_short_circuits() {
    let mut o = opts(16, 16);
    o.max_file_bytes = 4;
    let err = evaluate_hard_gates(&sprite_png(16, 16), &o).unwrap_err();
    assert_eq!(err.gate, HardGate::FileSize);
    assert_eq!(err.code, ReasonCode::FileSizeOutOfBounds);
    assert_eq!(err.checks.len(), 1);
    assert!(!err.is_adapter_fault());
}

#[test]
fn garbage_bytes_are_undecodable() {
    let err = evaluate_hard_gates(b"definitely not a png", &opts(16, 16)).unwrap_err();
    assert_eq!(err.code, ReasonCode::Undecodable);
    assert_eq!(err.checks.len(), 2);
}

#[test]
fn rgb_without_alpha_is_rejected() {
    let img = image::RgbImage::from_pixel(16, 16, image::Rgb([1, 2, 3]));
    let err =
        evaluate_hard_gates(&encode(image::DynamicImage::ImageRgb8(img)), &opts(16, 16))
            .unwrap_err();
    assert_eq!(err.gate, HardGate::ColorDepth);
    assert_eq!(err.code, ReasonCode::NoAlphaChannel);
}

#[test]
fn sixteen_bit_rgba_is_a_depth_mismatch() {
    let img = image::ImageBuffer::<image::Rgba<u16>, Vec<u16>>::from_pixel(
        16,
        16,
        image::Rgba([1000, 2000, 3000, 65535]),
    );
    let err = evaluate_hard_gates(&encode(image::DynamicImage::ImageRgba16(img)), &opts(16, 16))
        .unwrap_err();
    assert_eq!(err.code, ReasonCode::ColorDepthMismatch);
    assert!(err.is_adapter_fault());
}

#[test]
fn wrong_canvas_is_an_adapter_fault() {
    let err = evaluate_hard_gates(&sprite_png(16, 8), &opts(16, 16)).unwrap_err();
    assert_eq!(err.gate, HardGate::Dimensions);
    assert_eq!(err.code, ReasonCode::DimensionMismatch);
    assert!(err.is_adapter_fault());
    assert!(err.to_string().contains("dimensions"));
}

#[test]
fn fully_transparent_candidate_fails_last_gate() {
    let f = RgbaFrame::filled(16, 16, [9, 9, 9, 100]);
    let err = evaluate_hard_gates(&f.encode_png().unwrap(), &opts(16, 16)).unwrap_err();
    assert_eq!(err.gate, HardGate::NotFullyTransparent);
    assert_eq!(err.code, ReasonCode::FullyTransparent);
    assert_eq!(err.checks.len(), 5);
}
