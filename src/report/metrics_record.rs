use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::align::contact_patch::Alignment;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::SpriteGateResult;
use crate::gates::hard::{GateCheck, HardGate, HardGateFailure};
use crate::gates::reason::ReasonCode;
use crate::metrics::suite::SoftMetrics;
use crate::report::redact::redact;
use crate::scoring::composite::CompositeScore;
use crate::state::model::{AttemptRecord, FrameState, FrameStatus};
use crate::state::store::{RunLayout, write_json_atomic};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HardFailureSummary {
    pub gate: HardGate,
    pub code: ReasonCode,
    pub detail: String,
}

impl From<&HardGateFailure> for HardFailureSummary {
    fn from(f: &HardGateFailure) -> Self {
        Self {
            gate: f.gate,
            code: f.code,
            detail: f.detail.clone(),
        }
    }
}

/// Everything measured during one attempt.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttemptMetrics {
    pub attempt: u32,
    pub gate_checks: Vec<GateCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_failure: Option<HardFailureSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft: Option<SoftMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositeScore>,
}

/// Contents of `frames/frame_NNNN.metrics.json`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameMetricsRecord {
    pub run_id: String,
    pub frame: FrameIndex,
    pub status: FrameStatus,
    pub reasons: Vec<ReasonCode>,
    pub approved_path: Option<PathBuf>,
    pub attempts: Vec<AttemptRecord>,
    /// Metric snapshots of the attempts made in this process, by attempt number.
    pub snapshots: Vec<AttemptMetrics>,
    pub written_at: DateTime<Utc>,
}

impl FrameMetricsRecord {
    pub fn new(run_id: &str, frame: &FrameState, mut snapshots: Vec<AttemptMetrics>) -> Self {
        for s in &mut snapshots {
            s.adapter_error = s.adapter_error.as_deref().map(redact);
            if let Some(h) = &mut s.hard_failure {
                h.detail = redact(&h.detail);
            }
        }
        Self {
            run_id: run_id.to_owned(),
            frame: frame.index,
            status: frame.status,
            reasons: frame.reasons.clone(),
            approved_path: frame.approved_path.clone(),
            attempts: frame.attempts.clone(),
            snapshots,
            written_at: Utc::now(),
        }
    }

    pub fn write(&self, layout: &RunLayout) -> SpriteGateResult<PathBuf> {
        let path = layout.frame_metrics(self.frame);
        write_json_atomic(&path, self)?;
        Ok(path)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/report/metrics_record.rs"]
mod tests;
