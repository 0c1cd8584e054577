use super::*;
use crate::anchor::analysis::{AnalyzeOpts, analyze};

fn figure(x0: u32, color: [u8; 4]) -> RgbaFrame {
    let mut f = RgbaFrame::transparent(64, 64);
    for y in 16..56 {
        for x in x0..x0 + 12 {
            f.set_pixel(x, y, color);
        }
    }
    f
}

fn cfg() -> AuditConfig {
    AuditConfig {
        gates: crate::config::audit::GateConfig {
            min_file_bytes: 1,
            ..Default::default()
        },
        palette: vec![[200, 40, 40]],
        move_type: "idle".to_owned(),
        ..AuditConfig::default()
    }
}

#[test]
fn shifted_copy_of_anchor_passes_after_alignment() {
    let anchor_frame = figure(20, [200, 40, 40, 255]);
    let anchor = analyze(&anchor_frame, AnalyzeOpts::default()).unwrap();
    let cfg = cfg();
    let ctx = AuditContext {
        cfg: &cfg,
        anchor: &anchor,
        anchor_frame: &anchor_frame,
        previous: None,
    };
    let bytes = figure(26, [200, 40, 40, 255]).encode_png().unwrap();
    let report = audit_candidate(&bytes, &ctx).unwrap();
    assert_eq!(report.outcome, AttemptOutcome::Passed, "{:?}", report.reasons);
    assert_eq!(report.aligned.as_ref(), Some(&anchor_frame));
    assert_eq!(report.metrics.alignment.map(|a| a.shift_x), Some(-6));
    assert!(report.composite.unwrap() > 0.92);
}

#[test]
fn wrong_canvas_is_a_hard_adapter_fault() {
    let anchor_frame = figure(20, [200, 40, 40, 255]);
    let anchor = analyze(&anchor_frame, AnalyzeOpts::default()).unwrap();
    let cfg = cfg();
    let ctx = AuditContext {
        cfg: &cfg,
        anchor: &anchor,
        anchor_frame: &anchor_frame,
        previous: None,
    };
    let bytes = RgbaFrame::filled(32, 32, [200, 40, 40, 255])
        .encode_png()
        .unwrap();
    let report = audit_candidate(&bytes, &ctx).unwrap();
    assert_eq!(report.outcome, AttemptOutcome::HardFail);
    assert_eq!(report.reasons, vec![ReasonCode::DimensionMismatch]);
    assert_eq!(report.composite, None);
    assert!(report.metrics.soft.is_none());
    assert_eq!(report.metrics.gate_checks.len(), 4);
}

#[test]
fn off_palette_candidate_soft_fails() {
    let anchor_frame = figure(20, [200, 40, 40, 255]);
    let anchor = analyze(&anchor_frame, AnalyzeOpts::default()).unwrap();
    let cfg = cfg();
    let ctx = AuditContext {
        cfg: &cfg,
        anchor: &anchor,
        anchor_frame: &anchor_frame,
        previous: None,
    };
    let bytes = figure(20, [40, 200, 40, 255]).encode_png().unwrap();
    let report = audit_candidate(&bytes, &ctx).unwrap();
    assert_eq!(report.outcome, AttemptOutcome::SoftFail);
    assert!(report.reasons.contains(&ReasonCode::PaletteDrift));
    assert!(report.reasons.contains(&ReasonCode::IdentityDrift));
    assert!(report.composite.is_some());
}
