use super::*;

#[test]
fn new_rejects_mismatched_length() {
    assert!(RgbaFrame::new(2, 2, vec![0; 15]).is_err());
    assert!(RgbaFrame::new(2, 2, vec![0; 16]).is_ok());
}

#[test]
fn pixel_roundtrip_and_offsets() {
    let mut f = RgbaFrame::transparent(3, 2);
    f.set_pixel(2, 1, [1, 2, 3, 4]);
    assert_eq!(f.pixel(2, 1), [1, 2, 3, 4]);
    assert_eq!(f.offset(2, 1), (3 + 2) * 4);
    assert_eq!(f.pixel(0, 0), [0, 0, 0, 0]);
}

#[test]
fn png_encode_preserves_pixels() {
    let mut f = RgbaFrame::filled(4, 4, [10, 20, 30, 255]);
    f.set_pixel(1, 1, [200, 0, 0, 0]);
    let bytes = f.encode_png().unwrap();
    let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(back.dimensions(), (4, 4));
    assert_eq!(back.as_raw().as_slice(), f.data.as_slice());
}

#[test]
fn rect_helpers() {
    let r = PixelRect {
        x0: 2,
        y0: 4,
        x1: 5,
        y1: 4,
    };
    assert_eq!(r.width(), 4);
    assert_eq!(r.height(), 1);
    assert_eq!(r.center_x(), 3.5);
}

#[test]
fn frame_index_serializes_as_number() {
    let s = serde_json::to_string(&FrameIndex(7)).unwrap();
    assert_eq!(s, "7");
}
