use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{SpriteGateError, SpriteGateResult};
use crate::gates::reason::ReasonCode;
use crate::report::redact::redact;
use crate::retry::stop::StopReason;
use crate::state::model::{AttemptRecord, RUN_STATE_VERSION, RunState};

/// File layout of a run directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_state(&self) -> PathBuf {
        self.root.join("run_state.json")
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn approved_dir(&self) -> PathBuf {
        self.root.join("approved")
    }

    pub fn frame_metrics(&self, index: FrameIndex) -> PathBuf {
        self.frames_dir()
            .join(format!("frame_{:04}.metrics.json", index.0))
    }

    pub fn approved_frame(&self, index: FrameIndex) -> PathBuf {
        self.approved_dir().join(format!("frame_{:04}.png", index.0))
    }

    pub fn diagnostic(&self) -> PathBuf {
        self.root.join("diagnostic.json")
    }

    fn ensure_dirs(&self) -> SpriteGateResult<()> {
        for dir in [self.root.clone(), self.frames_dir(), self.approved_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create run directory '{}'", dir.display()))?;
        }
        Ok(())
    }
}

/// Writes `bytes` next to `path`, syncs it and renames over it, so readers never see a partial
/// file and the new contents survive a crash once this returns.
pub(crate) fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> SpriteGateResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file =
            File::create(&tmp).with_context(|| format!("create '{}'", tmp.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("write '{}'", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("sync '{}'", tmp.display()))?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("rename '{}' to '{}'", tmp.display(), path.display()))?;
    sync_parent_dir(path)?;
    Ok(())
}

/// Makes the rename itself durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> SpriteGateResult<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    File::open(parent)
        .and_then(|dir| dir.sync_all())
        .with_context(|| format!("sync directory '{}'", parent.display()))?;
    Ok(())
}

// Directories cannot be opened for syncing on this platform.
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> SpriteGateResult<()> {
    Ok(())
}

pub(crate) fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> SpriteGateResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &bytes)
}

/// Single writer of `run_state.json`.
///
/// Every transition is applied to a copy of the state and persisted before the in-memory
/// state is replaced, so a failed write leaves both unchanged.
#[derive(Debug)]
pub struct RunStateStore {
    layout: RunLayout,
    state: RunState,
}

impl RunStateStore {
    /// Starts a new run in `layout`. Fails if the directory already holds a run.
    pub fn create(layout: RunLayout, run_id: &str, frame_count: u32) -> SpriteGateResult<Self> {
        if frame_count == 0 {
            return Err(SpriteGateError::validation("a run needs at least one frame"));
        }
        if layout.run_state().exists() {
            return Err(SpriteGateError::persistence(format!(
                "'{}' already exists",
                layout.run_state().display()
            )));
        }
        layout.ensure_dirs()?;
        let state = RunState::new(run_id, frame_count, Utc::now());
        write_json_atomic(&layout.run_state(), &state)?;
        tracing::info!(run_id, frame_count, dir = %layout.root().display(), "run created");
        Ok(Self { layout, state })
    }

    /// Reloads an existing run for inspection or resume.
    pub fn open(layout: RunLayout) -> SpriteGateResult<Self> {
        let path = layout.run_state();
        let bytes =
            std::fs::read(&path).with_context(|| format!("read '{}'", path.display()))?;
        let state: RunState = serde_json::from_slice(&bytes)?;
        if state.version != RUN_STATE_VERSION {
            return Err(SpriteGateError::persistence(format!(
                "unsupported run state version {} (expected {RUN_STATE_VERSION})",
                state.version
            )));
        }
        state.check_invariants()?;
        layout.ensure_dirs()?;
        Ok(Self { layout, state })
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    fn apply(
        &mut self,
        f: impl FnOnce(&mut RunState) -> SpriteGateResult<()>,
    ) -> SpriteGateResult<()> {
        let mut next = self.state.clone();
        f(&mut next)?;
        next.updated_at = Utc::now();
        write_json_atomic(&self.layout.run_state(), &next)?;
        self.state = next;
        Ok(())
    }

    pub fn begin_attempt(&mut self, index: FrameIndex) -> SpriteGateResult<()> {
        self.apply(|s| s.begin_attempt(index))
    }

    pub fn mark_auditing(&mut self, index: FrameIndex) -> SpriteGateResult<()> {
        self.apply(|s| s.mark_auditing(index))
    }

    pub fn record_attempt(
        &mut self,
        index: FrameIndex,
        mut record: AttemptRecord,
        max_attempts: u32,
    ) -> SpriteGateResult<()> {
        record.detail = record.detail.as_deref().map(redact);
        self.apply(|s| s.record_attempt(index, record, max_attempts))
    }

    pub fn approve(&mut self, index: FrameIndex, path: PathBuf) -> SpriteGateResult<()> {
        self.apply(|s| s.approve(index, path))
    }

    pub fn retry(&mut self, index: FrameIndex) -> SpriteGateResult<()> {
        self.apply(|s| s.retry(index))
    }

    pub fn reject(&mut self, index: FrameIndex, reasons: Vec<ReasonCode>) -> SpriteGateResult<()> {
        self.apply(|s| s.reject(index, reasons))
    }

    pub fn fail_frame(
        &mut self,
        index: FrameIndex,
        reasons: Vec<ReasonCode>,
    ) -> SpriteGateResult<()> {
        self.apply(|s| s.fail_frame(index, reasons))
    }

    pub fn stop(&mut self, mut reason: StopReason) -> SpriteGateResult<()> {
        reason.message = redact(&reason.message);
        self.apply(|s| s.stop(reason))
    }

    pub fn complete(&mut self) -> SpriteGateResult<()> {
        self.apply(RunState::complete)
    }

    pub fn fail_run(&mut self, message: &str) -> SpriteGateResult<()> {
        let message = redact(message);
        self.apply(|s| s.fail_run(message))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/store.rs"]
mod tests;
