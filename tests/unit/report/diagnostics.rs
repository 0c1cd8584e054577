use std::path::PathBuf;

use super::*;
use crate::retry::ladder::Strategy;
use crate::retry::stop::StopCondition;
use crate::state::model::{AttemptOutcome, AttemptRecord};

fn attempt(n: u32, reasons: Vec<ReasonCode>) -> AttemptRecord {
    AttemptRecord {
        attempt: n,
        started_at: Utc::now(),
        prompt_hash: "ffffffffffffffff".to_owned(),
        strategy: Strategy::Baseline,
        outcome: if reasons.is_empty() {
            AttemptOutcome::Passed
        } else {
            AttemptOutcome::SoftFail
        },
        reasons,
        composite: Some(0.5),
        duration_ms: 1,
        detail: None,
    }
}

fn run_with_failures() -> RunState {
    let mut s = RunState::new("walk", 6, Utc::now());
    let f0 = FrameIndex(0);
    s.begin_attempt(f0).unwrap();
    s.mark_auditing(f0).unwrap();
    s.record_attempt(f0, attempt(1, vec![]), 5).unwrap();
    s.approve(f0, PathBuf::from("a.png")).unwrap();

    for i in 1..=4 {
        let f = FrameIndex(i);
        for n in 1..=2 {
            s.begin_attempt(f).unwrap();
            s.mark_auditing(f).unwrap();
            s.record_attempt(f, attempt(n, vec![ReasonCode::IdentityDrift]), 2)
                .unwrap();
            if n == 1 {
                s.retry(f).unwrap();
            }
        }
        s.fail_frame(
            f,
            vec![ReasonCode::MaxAttemptsReached, ReasonCode::IdentityDrift],
        )
        .unwrap();
    }
    s.stop(StopReason {
        condition: StopCondition::ConsecutiveFails,
        observed: 4.0,
        threshold: 4.0,
        message: "4 consecutive frames rejected or failed".to_owned(),
    })
    .unwrap();
    s
}

#[test]
fn breakdown_counts_frames_by_status() {
    let d = diagnose(&run_with_failures(), Utc::now());
    assert_eq!(
        d.frames,
        FrameBreakdown {
            total: 6,
            approved: 1,
            rejected: 0,
            failed: 4,
            open: 1,
        }
    );
    assert_eq!(d.total_attempts, 9);
    assert_eq!(
        d.stop_reason.map(|r| r.condition),
        Some(StopCondition::ConsecutiveFails)
    );
}

#[test]
fn dominant_code_drives_root_cause() {
    let d = diagnose(&run_with_failures(), Utc::now());
    let top = &d.top_failures[0];
    assert_eq!(top.code, ReasonCode::IdentityDrift);
    assert_eq!(top.occurrences, 8);
    assert_eq!(
        top.example_frames,
        vec![FrameIndex(1), FrameIndex(2), FrameIndex(3)]
    );
    assert_eq!(d.root_cause.confidence, Confidence::High);
    assert!(d.root_cause.summary.starts_with("IDENTITY_DRIFT"));
}

#[test]
fn mixed_failures_lower_confidence() {
    let mut s = RunState::new("mix", 3, Utc::now());
    let codes = [
        ReasonCode::PaletteDrift,
        ReasonCode::OrphanNoise,
        ReasonCode::AdapterFailure,
    ];
    for (i, code) in codes.iter().enumerate() {
        let f = FrameIndex(i as u32);
        s.begin_attempt(f).unwrap();
        s.record_attempt(f, attempt(1, vec![*code]), 5).unwrap();
        s.fail_frame(f, vec![*code]).unwrap();
    }
    let d = diagnose(&s, Utc::now());
    assert_eq!(d.top_failures.len(), 3);
    assert_eq!(d.root_cause.confidence, Confidence::Low);
}

#[test]
fn adapter_faults_point_at_the_adapter() {
    let mut s = RunState::new("dims", 1, Utc::now());
    let f = FrameIndex(0);
    s.begin_attempt(f).unwrap();
    s.record_attempt(f, attempt(1, vec![ReasonCode::DimensionMismatch]), 5)
        .unwrap();
    s.reject(f, vec![ReasonCode::DimensionMismatch]).unwrap();
    let d = diagnose(&s, Utc::now());
    assert!(d.root_cause.summary.contains("adapter"));
    assert_eq!(d.frames.rejected, 1);
}

#[test]
fn clean_run_has_low_confidence_placeholder() {
    let s = RunState::new("empty", 2, Utc::now());
    let d = diagnose(&s, Utc::now());
    assert!(d.top_failures.is_empty());
    assert_eq!(d.root_cause.confidence, Confidence::Low);
}

#[test]
fn per_frame_section_lists_every_frame() {
    let d = diagnose(&run_with_failures(), Utc::now());
    assert_eq!(d.per_frame.len(), 6);
    assert_eq!(
        d.per_frame.iter().map(|f| f.index).collect::<Vec<_>>(),
        (0..6).map(FrameIndex).collect::<Vec<_>>()
    );

    let approved = &d.per_frame[0];
    assert_eq!(approved.status, FrameStatus::Approved);
    assert_eq!(approved.attempts, 1);
    assert!(approved.reasons.is_empty());
    assert_eq!(approved.strategies, vec![Strategy::Baseline]);

    let failed = &d.per_frame[2];
    assert_eq!(failed.status, FrameStatus::Failed);
    assert_eq!(failed.attempts, 2);
    assert_eq!(
        failed.reasons,
        vec![ReasonCode::MaxAttemptsReached, ReasonCode::IdentityDrift]
    );
    assert_eq!(failed.last_composite, Some(0.5));
    assert_eq!(failed.strategies.len(), 2);

    let open = &d.per_frame[5];
    assert_eq!(open.status, FrameStatus::Pending);
    assert_eq!(open.attempts, 0);
    assert_eq!(open.last_composite, None);
    assert!(open.strategies.is_empty());
}
