use super::*;

fn gray(v: u8) -> RgbaFrame {
    RgbaFrame::filled(8, 8, [v, v, v, 255])
}

#[test]
fn identical_frames_have_zero_delta() {
    let (d, overlap) = temporal_delta(&gray(90), &gray(90)).unwrap();
    assert_eq!(d, 0.0);
    assert_eq!(overlap, 64);
}

#[test]
fn delta_is_normalized_mean_rgb_difference() {
    let (d, _) = temporal_delta(&gray(0), &gray(51)).unwrap();
    assert!((d - 0.2).abs() < 1e-12);
}

#[test]
fn pixels_transparent_in_either_frame_are_excluded() {
    let a = gray(0);
    let mut b = gray(0);
    b.set_pixel(0, 0, [255, 255, 255, 0]);
    let (d, overlap) = temporal_delta(&a, &b).unwrap();
    assert_eq!(d, 0.0);
    assert_eq!(overlap, 63);
}

#[test]
fn no_overlap_is_maximal_change() {
    let a = gray(0);
    let b = RgbaFrame::transparent(8, 8);
    assert_eq!(temporal_delta(&a, &b).unwrap(), (1.0, 0));
}

#[test]
fn idle_threshold_fails_on_large_change() {
    let cfg = TemporalConfig::default();
    let prev = gray(0);
    let out = temporal_coherence(&gray(51), Some(&prev), "idle", &cfg).unwrap();
    assert!(out.failed());
    match out {
        TemporalOutcome::Evaluated { threshold, .. } => assert_eq!(threshold, 0.05),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn run_threshold_tolerates_moderate_change() {
    let cfg = TemporalConfig::default();
    let prev = gray(0);
    // delta = 0.1, run allows 0.18
    let out = temporal_coherence(&gray(25), Some(&prev), "Run", &cfg).unwrap();
    assert!(!out.failed());
    let s = out.stability_score().unwrap();
    assert!(s > 0.0 && s < 1.0);
}

#[test]
fn bypass_moves_are_not_evaluated() {
    let cfg = TemporalConfig::default();
    let prev = gray(0);
    let out = temporal_coherence(&gray(255), Some(&prev), "attack", &cfg).unwrap();
    assert_eq!(
        out,
        TemporalOutcome::Bypassed {
            move_type: "attack".to_owned()
        }
    );
    assert!(!out.failed());
    assert_eq!(out.stability_score(), None);
}

#[test]
fn unknown_move_type_uses_strict_default() {
    let cfg = TemporalConfig::default();
    let prev = gray(0);
    // delta ~0.08: fine for walk, too much for the strict default.
    let walk = temporal_coherence(&gray(20), Some(&prev), "walk", &cfg).unwrap();
    let unknown = temporal_coherence(&gray(20), Some(&prev), "moonwalk", &cfg).unwrap();
    assert!(!walk.failed());
    assert!(unknown.failed());
}

#[test]
fn first_frame_is_not_applicable() {
    let cfg = TemporalConfig::default();
    let out = temporal_coherence(&gray(0), None, "idle", &cfg).unwrap();
    assert_eq!(out, TemporalOutcome::NotApplicable);
    assert_eq!(out.stability_score(), None);
}

#[test]
fn size_mismatch_is_an_error() {
    let a = gray(0);
    let b = RgbaFrame::filled(4, 4, [0, 0, 0, 255]);
    assert!(temporal_delta(&a, &b).is_err());
}
