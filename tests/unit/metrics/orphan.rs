use super::*;

fn background_with_spots(spots: u32) -> RgbaFrame {
    let mut f = RgbaFrame::filled(64, 64, [30, 30, 60, 255]);
    for i in 0..spots {
        f.set_pixel(5 + i * 8, 10 + i * 4, [250, 250, 0, 255]);
    }
    f
}

#[test]
fn six_spots_are_a_warning() {
    let r = orphan_pixels(&background_with_spots(6), 5, 15);
    assert_eq!(r.count, 6);
    assert_eq!(r.class, OrphanClass::Warning);
    assert_eq!(r.positions.len(), 6);
    assert_eq!(r.positions[0], (5, 10));
}

#[test]
fn five_spots_pass() {
    let r = orphan_pixels(&background_with_spots(5), 5, 15);
    assert_eq!(r.count, 5);
    assert_eq!(r.class, OrphanClass::Pass);
}

#[test]
fn more_than_warn_max_fails() {
    let mut f = RgbaFrame::filled(40, 40, [0, 0, 0, 255]);
    for i in 0..16u32 {
        f.set_pixel(2 + (i % 8) * 4, 5 + (i / 8) * 10, [255, 0, 0, 255]);
    }
    let r = orphan_pixels(&f, 5, 15);
    assert_eq!(r.count, 16);
    assert_eq!(r.class, OrphanClass::Fail);
}

#[test]
fn border_and_transparent_pixels_are_ignored() {
    let mut f = RgbaFrame::transparent(16, 16);
    // Isolated on the border.
    f.set_pixel(0, 5, [255, 0, 0, 255]);
    f.set_pixel(15, 15, [255, 0, 0, 255]);
    // Isolated but transparent.
    f.set_pixel(8, 8, [255, 0, 0, 0]);
    assert_eq!(orphan_pixels(&f, 5, 15).count, 0);
}

#[test]
fn alpha_difference_breaks_a_match() {
    let mut f = RgbaFrame::filled(8, 8, [10, 10, 10, 255]);
    f.set_pixel(4, 4, [10, 10, 10, 254]);
    let r = orphan_pixels(&f, 5, 15);
    assert_eq!(r.count, 1);
    assert_eq!(r.positions, vec![(4, 4)]);
}

#[test]
fn pairs_are_not_orphans() {
    let mut f = RgbaFrame::filled(8, 8, [10, 10, 10, 255]);
    f.set_pixel(3, 3, [200, 0, 0, 255]);
    f.set_pixel(4, 3, [200, 0, 0, 255]);
    assert_eq!(orphan_pixels(&f, 5, 15).count, 0);
}

#[test]
fn tiny_frames_have_no_interior() {
    let f = RgbaFrame::filled(2, 2, [1, 2, 3, 255]);
    let r = orphan_pixels(&f, 5, 15);
    assert_eq!(r.count, 0);
    assert_eq!(r.class, OrphanClass::Pass);
}
