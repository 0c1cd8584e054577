use super::*;

/// 10px wide, 40px tall block with its left edge at `x0` and feet on `baseline`.
fn figure(x0: u32, baseline: u32) -> RgbaFrame {
    let mut f = RgbaFrame::transparent(200, 100);
    for y in baseline - 39..=baseline {
        for x in x0..x0 + 10 {
            f.set_pixel(x, y, [180, 60, 20, 255]);
        }
    }
    f
}

fn anchor() -> AnchorAnalysis {
    analyze(&figure(55, 59), AnalyzeOpts::default()).unwrap()
}

#[test]
fn large_offset_is_clamped_to_max_shift() {
    let cfg = AlignConfig::default();
    let out = align(&figure(105, 59), &anchor(), &cfg).unwrap();
    assert_eq!(out.alignment.wanted_x, -50);
    assert_eq!(out.alignment.shift_x, -32);
    assert!(out.alignment.clamped);
    assert!((out.alignment.residual_px - 17.5).abs() < 1e-9);
}

#[derive(Clone, Default)]
struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn clamped_shift_logs_a_warning() {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();

    let cfg = AlignConfig::default();
    let out = tracing::subscriber::with_default(subscriber, || {
        align(&figure(105, 59), &anchor(), &cfg).unwrap()
    });
    assert!(out.alignment.clamped);

    let text = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
    assert!(text.contains("WARN"), "{text}");
    assert!(text.contains("alignment shift clamped"), "{text}");
    assert!(text.contains("wanted_x=-50"), "{text}");
    assert!(text.contains("shift_x=-32"), "{text}");
}

#[test]
fn unclamped_shift_logs_nothing() {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();

    let cfg = AlignConfig::default();
    tracing::subscriber::with_default(subscriber, || {
        align(&figure(65, 59), &anchor(), &cfg).unwrap();
    });
    assert!(log.0.lock().unwrap().is_empty());
}

#[test]
fn small_offset_is_applied_exactly() {
    let cfg = AlignConfig::default();
    let out = align(&figure(65, 59), &anchor(), &cfg).unwrap();
    assert_eq!(out.alignment.shift_x, -10);
    assert_eq!(out.alignment.shift_y, 0);
    assert!(!out.alignment.clamped);
    assert_eq!(out.alignment.residual_px, 0.0);
    assert_eq!(out.frame, figure(55, 59));
}

#[test]
fn vertical_lock_snaps_baseline() {
    let cfg = AlignConfig::default();
    let out = align(&figure(55, 62), &anchor(), &cfg).unwrap();
    assert_eq!(out.alignment.shift_y, -3);
    assert_eq!(out.frame, figure(55, 59));

    let unlocked = AlignConfig {
        lock_vertical: false,
        ..AlignConfig::default()
    };
    let out = align(&figure(55, 62), &anchor(), &unlocked).unwrap();
    assert_eq!(out.alignment.shift_y, 0);
    assert_eq!(out.alignment.residual_px, 3.0);
}

#[test]
fn none_mode_is_passthrough() {
    let cfg = AlignConfig {
        mode: AlignMode::None,
        ..AlignConfig::default()
    };
    let cand = figure(65, 59);
    let out = align(&cand, &anchor(), &cfg).unwrap();
    assert_eq!(out.frame, cand);
    assert_eq!((out.alignment.shift_x, out.alignment.shift_y), (0, 0));
    assert!((out.alignment.residual_px - 9.5).abs() < 1e-9);
}

#[test]
fn center_mode_uses_bounding_box() {
    let cfg = AlignConfig {
        mode: AlignMode::Center,
        ..AlignConfig::default()
    };
    // A tall block with a wide cape at the top: bbox center differs from the feet.
    let mut cand = figure(70, 59);
    for y in 20..25 {
        for x in 80..100 {
            cand.set_pixel(x, y, [180, 60, 20, 255]);
        }
    }
    let a = anchor();
    let out = align(&cand, &a, &cfg).unwrap();
    // bbox 70..=99, center 84.5; anchor bbox center 59.5
    assert_eq!(out.alignment.shift_x, -25);
    assert!(out.alignment.residual_px > 1.0);
}

#[test]
fn shift_pads_with_transparency_without_blending() {
    let mut f = RgbaFrame::transparent(4, 3);
    f.set_pixel(0, 0, [1, 2, 3, 255]);
    f.set_pixel(3, 2, [9, 8, 7, 200]);
    let s = shift_frame(&f, 1, 0);
    assert_eq!(s.pixel(1, 0), [1, 2, 3, 255]);
    assert_eq!(s.pixel(0, 0), [0, 0, 0, 0]);
    // Cropped at the right edge.
    assert!(s.data.chunks_exact(4).all(|px| px != [9, 8, 7, 200]));

    let down = shift_frame(&f, -3, 2);
    assert_eq!(down.pixel(0, 2), [0, 0, 0, 0]);
    assert_eq!(shift_frame(&f, 4, 0), RgbaFrame::transparent(4, 3));
}

#[test]
fn mismatched_canvas_is_rejected() {
    let cand = RgbaFrame::filled(10, 10, [0, 0, 0, 255]);
    assert!(align(&cand, &anchor(), &AlignConfig::default()).is_err());
}
