use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{SpriteGateError, SpriteGateResult};
use crate::gates::reason::ReasonCode;
use crate::retry::ladder::{Strategy, StrategyUsage};
use crate::retry::stop::{RunTally, StopReason};

/// Current `run_state.json` schema version.
pub const RUN_STATE_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Stopped,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    Pending,
    Generating,
    Auditing,
    Retrying,
    Approved,
    Rejected,
    Failed,
}

impl FrameStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Failed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Passed,
    SoftFail,
    HardFail,
}

/// One generation attempt. Never modified after it is appended.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttemptRecord {
    /// 1-based within the frame.
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub prompt_hash: String,
    pub strategy: Strategy,
    pub outcome: AttemptOutcome,
    pub reasons: Vec<ReasonCode>,
    /// `None` for hard failures and adapter failures.
    pub composite: Option<f64>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameState {
    pub index: FrameIndex,
    pub status: FrameStatus,
    pub attempts: Vec<AttemptRecord>,
    pub approved_path: Option<PathBuf>,
    /// Terminal reasons; non-empty for `rejected` and `failed`.
    pub reasons: Vec<ReasonCode>,
}

impl FrameState {
    fn new(index: FrameIndex) -> Self {
        Self {
            index,
            status: FrameStatus::Pending,
            attempts: Vec::new(),
            approved_path: None,
            reasons: Vec::new(),
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn strategy_usage(&self) -> StrategyUsage {
        StrategyUsage::from_strategies(self.attempts.iter().map(|a| a.strategy))
    }

    pub fn last_attempt(&self) -> Option<&AttemptRecord> {
        self.attempts.last()
    }
}

/// Persistent record of one generation run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunState {
    pub version: u32,
    pub run_id: String,
    pub status: RunStatus,
    pub total_attempts: u32,
    pub consecutive_fails: u32,
    pub frames: Vec<FrameState>,
    pub stop_reason: Option<StopReason>,
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>, frame_count: u32, now: DateTime<Utc>) -> Self {
        Self {
            version: RUN_STATE_VERSION,
            run_id: run_id.into(),
            status: RunStatus::InProgress,
            total_attempts: 0,
            consecutive_fails: 0,
            frames: (0..frame_count).map(|i| FrameState::new(FrameIndex(i))).collect(),
            stop_reason: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn frame(&self, index: FrameIndex) -> SpriteGateResult<&FrameState> {
        self.frames
            .get(index.0 as usize)
            .ok_or_else(|| SpriteGateError::state(format!("frame {index} does not exist")))
    }

    fn frame_mut(&mut self, index: FrameIndex) -> SpriteGateResult<&mut FrameState> {
        self.frames
            .get_mut(index.0 as usize)
            .ok_or_else(|| SpriteGateError::state(format!("frame {index} does not exist")))
    }

    /// First frame that has not reached a terminal status.
    pub fn next_open_frame(&self) -> Option<FrameIndex> {
        self.frames
            .iter()
            .find(|f| !f.status.is_terminal())
            .map(|f| f.index)
    }

    /// Approved artifact of the closest approved frame before `index`.
    pub fn previous_approved(&self, index: FrameIndex) -> Option<&Path> {
        self.frames[..(index.0 as usize).min(self.frames.len())]
            .iter()
            .rev()
            .find(|f| f.status == FrameStatus::Approved)
            .and_then(|f| f.approved_path.as_deref())
    }

    pub fn tally(&self) -> RunTally {
        let mut t = RunTally {
            total_attempts: self.total_attempts,
            consecutive_fails: self.consecutive_fails,
            ..RunTally::default()
        };
        for f in self.frames.iter().filter(|f| f.status.is_terminal()) {
            t.terminal_frames += 1;
            if f.status != FrameStatus::Approved {
                t.unsuccessful_frames += 1;
            }
            if f.attempt_count() > 1 {
                t.retried_frames += 1;
            }
        }
        t
    }

    /// `total_attempts` must equal the attempts recorded across frames.
    pub fn check_invariants(&self) -> SpriteGateResult<()> {
        let sum: u32 = self.frames.iter().map(FrameState::attempt_count).sum();
        if sum != self.total_attempts {
            return Err(SpriteGateError::state(format!(
                "total_attempts is {} but frames record {sum} attempts",
                self.total_attempts
            )));
        }
        for f in &self.frames {
            if matches!(f.status, FrameStatus::Rejected | FrameStatus::Failed) && f.reasons.is_empty()
            {
                return Err(SpriteGateError::state(format!(
                    "frame {} is {:?} without reasons",
                    f.index, f.status
                )));
            }
        }
        Ok(())
    }

    fn ensure_in_progress(&self) -> SpriteGateResult<()> {
        if self.status != RunStatus::InProgress {
            return Err(SpriteGateError::state(format!(
                "run '{}' is {:?}",
                self.run_id, self.status
            )));
        }
        Ok(())
    }

    fn transition(
        &mut self,
        index: FrameIndex,
        allowed: &[FrameStatus],
        to: FrameStatus,
    ) -> SpriteGateResult<&mut FrameState> {
        self.ensure_in_progress()?;
        let frame = self.frame_mut(index)?;
        if !allowed.contains(&frame.status) {
            return Err(SpriteGateError::state(format!(
                "frame {index} cannot move from {:?} to {to:?}",
                frame.status
            )));
        }
        frame.status = to;
        Ok(frame)
    }

    /// `pending | retrying → generating`. Interrupted frames resume from `generating` or
    /// `auditing`.
    pub fn begin_attempt(&mut self, index: FrameIndex) -> SpriteGateResult<()> {
        self.transition(
            index,
            &[
                FrameStatus::Pending,
                FrameStatus::Retrying,
                FrameStatus::Generating,
                FrameStatus::Auditing,
            ],
            FrameStatus::Generating,
        )?;
        Ok(())
    }

    pub fn mark_auditing(&mut self, index: FrameIndex) -> SpriteGateResult<()> {
        self.transition(index, &[FrameStatus::Generating], FrameStatus::Auditing)?;
        Ok(())
    }

    /// Appends `record` and bumps the run total.
    pub fn record_attempt(
        &mut self,
        index: FrameIndex,
        record: AttemptRecord,
        max_attempts: u32,
    ) -> SpriteGateResult<()> {
        self.ensure_in_progress()?;
        let frame = self.frame_mut(index)?;
        if !matches!(frame.status, FrameStatus::Generating | FrameStatus::Auditing) {
            return Err(SpriteGateError::state(format!(
                "frame {index} is {:?}, not generating or auditing",
                frame.status
            )));
        }
        if frame.attempt_count() >= max_attempts {
            return Err(SpriteGateError::state(format!(
                "frame {index} already used {max_attempts} attempts"
            )));
        }
        if record.attempt != frame.attempt_count() + 1 {
            return Err(SpriteGateError::state(format!(
                "frame {index} expected attempt {}, got {}",
                frame.attempt_count() + 1,
                record.attempt
            )));
        }
        frame.attempts.push(record);
        self.total_attempts += 1;
        self.check_invariants()
    }

    pub fn approve(&mut self, index: FrameIndex, path: PathBuf) -> SpriteGateResult<()> {
        let frame = self.transition(index, &[FrameStatus::Auditing], FrameStatus::Approved)?;
        frame.approved_path = Some(path);
        frame.reasons.clear();
        self.consecutive_fails = 0;
        Ok(())
    }

    pub fn retry(&mut self, index: FrameIndex) -> SpriteGateResult<()> {
        self.transition(
            index,
            &[FrameStatus::Generating, FrameStatus::Auditing],
            FrameStatus::Retrying,
        )?;
        Ok(())
    }

    pub fn reject(&mut self, index: FrameIndex, reasons: Vec<ReasonCode>) -> SpriteGateResult<()> {
        self.finish_unsuccessful(index, reasons, FrameStatus::Rejected)
    }

    pub fn fail_frame(&mut self, index: FrameIndex, reasons: Vec<ReasonCode>) -> SpriteGateResult<()> {
        self.finish_unsuccessful(index, reasons, FrameStatus::Failed)
    }

    fn finish_unsuccessful(
        &mut self,
        index: FrameIndex,
        reasons: Vec<ReasonCode>,
        to: FrameStatus,
    ) -> SpriteGateResult<()> {
        if reasons.is_empty() {
            return Err(SpriteGateError::state(format!(
                "frame {index} needs at least one reason to become {to:?}"
            )));
        }
        let frame = self.transition(
            index,
            &[
                FrameStatus::Generating,
                FrameStatus::Auditing,
                FrameStatus::Retrying,
            ],
            to,
        )?;
        frame.reasons = reasons;
        self.consecutive_fails += 1;
        Ok(())
    }

    pub fn stop(&mut self, reason: StopReason) -> SpriteGateResult<()> {
        self.ensure_in_progress()?;
        self.status = RunStatus::Stopped;
        self.stop_reason = Some(reason);
        Ok(())
    }

    pub fn complete(&mut self) -> SpriteGateResult<()> {
        self.ensure_in_progress()?;
        if let Some(open) = self.next_open_frame() {
            return Err(SpriteGateError::state(format!(
                "cannot complete run with frame {open} still open"
            )));
        }
        self.status = RunStatus::Completed;
        Ok(())
    }

    pub fn fail_run(&mut self, message: String) -> SpriteGateResult<()> {
        self.ensure_in_progress()?;
        self.status = RunStatus::Failed;
        self.failure = Some(message);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/model.rs"]
mod tests;
