use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;

use crate::anchor::analysis::{AnalyzeOpts, AnchorAnalysis, analyze};
use crate::anchor::chroma::{DEFAULT_CHROMA_CANDIDATES, extract_palette, select_chroma_key};
use crate::config::audit::AuditConfig;
use crate::engine::adapter::{GenerationAdapter, GenerationRequest};
use crate::engine::auditor::{AuditContext, audit_candidate};
use crate::foundation::core::{FrameIndex, Rgb, RgbaFrame};
use crate::foundation::error::SpriteGateResult;
use crate::foundation::math::StableHash;
use crate::gates::reason::ReasonCode;
use crate::report::diagnostics::diagnose;
use crate::report::metrics_record::{AttemptMetrics, FrameMetricsRecord};
use crate::retry::ladder::{LadderStep, Strategy, next_step, select_strategy};
use crate::retry::stop::{DEFAULT_CIRCUIT_BREAKER, StopReason, circuit_breaker, evaluate_stop};
use crate::state::model::{AttemptOutcome, AttemptRecord, FrameStatus, RunStatus};
use crate::state::store::{RunLayout, RunStateStore, write_bytes_atomic};

/// Colors sampled from the anchor when picking a chroma key.
const CHROMA_PALETTE_COLORS: usize = 64;

/// Run-level knobs that do not come from the manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOpts {
    /// Directory holding `run_state.json` and the run artifacts.
    pub run_dir: PathBuf,
    /// Hard ceiling on attempts across the whole run.
    pub circuit_breaker: u32,
}

impl EngineOpts {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            circuit_breaker: DEFAULT_CIRCUIT_BREAKER,
        }
    }
}

/// Outcome of [`Engine::run`].
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub status: RunStatus,
    pub approved: u32,
    pub rejected: u32,
    pub failed: u32,
    pub total_attempts: u32,
    pub stop_reason: Option<StopReason>,
}

enum FrameEnd {
    Terminal,
    Halted(StopReason),
}

/// Generation-audit-retry loop over the frames of one run.
pub struct Engine<A> {
    cfg: AuditConfig,
    opts: EngineOpts,
    adapter: A,
    anchor_frame: RgbaFrame,
    anchor: AnchorAnalysis,
    chroma_key: Option<Rgb>,
    store: RunStateStore,
}

impl<A: GenerationAdapter> Engine<A> {
    /// Creates a new run directory and analyzes the anchor.
    ///
    /// An anchor that cannot be analyzed marks the freshly created run `failed`.
    pub fn start(
        cfg: AuditConfig,
        opts: EngineOpts,
        run_id: &str,
        frame_count: u32,
        anchor_frame: RgbaFrame,
        adapter: A,
    ) -> SpriteGateResult<Self> {
        cfg.validate()?;
        cfg.check_anchor_size(anchor_frame.width, anchor_frame.height)?;
        let store = RunStateStore::create(RunLayout::new(&opts.run_dir), run_id, frame_count)?;
        Self::with_store(cfg, opts, anchor_frame, adapter, store)
    }

    /// Reopens an interrupted run and continues at its first open frame.
    pub fn resume(
        cfg: AuditConfig,
        opts: EngineOpts,
        anchor_frame: RgbaFrame,
        adapter: A,
    ) -> SpriteGateResult<Self> {
        cfg.validate()?;
        cfg.check_anchor_size(anchor_frame.width, anchor_frame.height)?;
        let store = RunStateStore::open(RunLayout::new(&opts.run_dir))?;
        tracing::info!(
            run_id = %store.state().run_id,
            total_attempts = store.state().total_attempts,
            next = ?store.state().next_open_frame(),
            "resuming run"
        );
        Self::with_store(cfg, opts, anchor_frame, adapter, store)
    }

    fn with_store(
        cfg: AuditConfig,
        opts: EngineOpts,
        anchor_frame: RgbaFrame,
        adapter: A,
        mut store: RunStateStore,
    ) -> SpriteGateResult<Self> {
        let analyzed = analyze(
            &anchor_frame,
            AnalyzeOpts {
                alpha_threshold: cfg.align.alpha_threshold,
                root_zone_ratio: cfg.align.root_zone_ratio,
            },
        );
        let anchor = match analyzed {
            Ok(a) => a,
            Err(e) => {
                if !store.state().status.is_terminal() {
                    store.fail_run(&format!("anchor analysis failed: {e}"))?;
                }
                return Err(e);
            }
        };

        let anchor_palette =
            extract_palette(&anchor_frame, cfg.align.alpha_threshold, CHROMA_PALETTE_COLORS);
        let chroma_key = select_chroma_key(
            &anchor_palette,
            &DEFAULT_CHROMA_CANDIDATES,
            cfg.thresholds.palette_tolerance,
        );
        tracing::info!(
            baseline_y = anchor.baseline_y,
            root_x = anchor.root_x,
            ?chroma_key,
            "anchor analyzed"
        );

        Ok(Self {
            cfg,
            opts,
            adapter,
            anchor_frame,
            anchor,
            chroma_key,
            store,
        })
    }

    pub fn store(&self) -> &RunStateStore {
        &self.store
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn anchor(&self) -> &AnchorAnalysis {
        &self.anchor
    }

    pub fn chroma_key(&self) -> Option<Rgb> {
        self.chroma_key
    }

    /// Processes frames until every frame is terminal or a stop condition halts the run.
    ///
    /// Errors that prevent the engine from continuing mark the run `failed` before returning.
    pub fn run(&mut self) -> SpriteGateResult<RunSummary> {
        match self.run_frames() {
            Ok(()) => Ok(self.summary()),
            Err(e) => {
                if !self.store.state().status.is_terminal()
                    && let Err(persist) = self.store.fail_run(&e.to_string())
                {
                    tracing::error!(error = %persist, "could not mark run failed");
                }
                Err(e)
            }
        }
    }

    fn run_frames(&mut self) -> SpriteGateResult<()> {
        while !self.store.state().status.is_terminal() {
            let Some(index) = self.store.state().next_open_frame() else {
                // A resumed run may have stopped between its last frame and completion.
                if !self.check_stop()? {
                    self.store.complete()?;
                    tracing::info!(run_id = %self.store.state().run_id, "run completed");
                }
                break;
            };
            match self.process_frame(index)? {
                FrameEnd::Halted(reason) => self.halt(reason)?,
                FrameEnd::Terminal => {
                    self.check_stop()?;
                }
            }
        }
        Ok(())
    }

    /// Evaluates the stop conditions and halts the run if one fires.
    fn check_stop(&mut self) -> SpriteGateResult<bool> {
        let tally = self.store.state().tally();
        match evaluate_stop(&tally, &self.cfg.retry, self.opts.circuit_breaker) {
            Some(reason) => {
                self.halt(reason)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn halt(&mut self, reason: StopReason) -> SpriteGateResult<()> {
        tracing::warn!(
            condition = %reason.condition,
            observed = reason.observed,
            threshold = reason.threshold,
            "stop condition triggered"
        );
        self.store.stop(reason)?;
        let diagnostic = diagnose(self.store.state(), Utc::now());
        diagnostic.write(self.store.layout())?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(run_id = %self.store.state().run_id))]
    fn process_frame(&mut self, index: FrameIndex) -> SpriteGateResult<FrameEnd> {
        let max_attempts = self.cfg.retry.max_attempts_per_frame;
        let previous_path = self.store.state().previous_approved(index).map(PathBuf::from);
        let previous = previous_path
            .as_deref()
            .map(RgbaFrame::load)
            .transpose()?;
        let mut snapshots: Vec<AttemptMetrics> = Vec::new();

        loop {
            if let Some(reason) =
                circuit_breaker(self.store.state().total_attempts, self.opts.circuit_breaker)
            {
                return Ok(FrameEnd::Halted(reason));
            }

            let frame = self.store.state().frame(index)?;
            let attempt = frame.attempt_count() + 1;
            let last_reasons: Vec<ReasonCode> = frame
                .last_attempt()
                .map(|a| a.reasons.clone())
                .unwrap_or_default();
            if attempt > max_attempts {
                // Resumed with the budget already spent.
                return self.finish(index, FrameStatus::Failed, last_reasons, snapshots);
            }
            let strategy = if attempt == 1 {
                Strategy::Baseline
            } else {
                select_strategy(&last_reasons, &frame.strategy_usage())
            };

            self.store.begin_attempt(index)?;
            let prompt_hash = self.prompt_hash(index, attempt, strategy);
            let req = GenerationRequest {
                run_id: self.store.state().run_id.clone(),
                frame: index,
                attempt,
                strategy,
                prompt_hash: prompt_hash.clone(),
                chroma_key: self.chroma_key,
                previous_approved: previous_path.clone(),
            };
            tracing::info!(attempt, %strategy, "generating");

            let started_at = Utc::now();
            let clock = Instant::now();
            let mut record = AttemptRecord {
                attempt,
                started_at,
                prompt_hash,
                strategy,
                outcome: AttemptOutcome::SoftFail,
                reasons: Vec::new(),
                composite: None,
                duration_ms: 0,
                detail: None,
            };
            let mut snapshot = AttemptMetrics {
                attempt,
                ..AttemptMetrics::default()
            };
            let mut approved_image = None;

            match self.adapter.generate(&req) {
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "adapter failed");
                    record.reasons = vec![ReasonCode::AdapterFailure];
                    record.detail = Some(e.to_string());
                    snapshot.adapter_error = Some(e.to_string());
                }
                Ok(bytes) => {
                    self.store.mark_auditing(index)?;
                    let ctx = AuditContext {
                        cfg: &self.cfg,
                        anchor: &self.anchor,
                        anchor_frame: &self.anchor_frame,
                        previous: previous.as_ref(),
                    };
                    let report = audit_candidate(&bytes, &ctx)?;
                    record.outcome = report.outcome;
                    record.reasons = report.reasons;
                    record.composite = report.composite;
                    record.detail = report
                        .metrics
                        .hard_failure
                        .as_ref()
                        .map(|h| h.detail.clone());
                    snapshot = AttemptMetrics {
                        attempt,
                        ..report.metrics
                    };
                    if report.outcome == AttemptOutcome::Passed {
                        approved_image = report.aligned;
                    }
                }
            }
            record.duration_ms = clock.elapsed().as_millis() as u64;
            let reasons = record.reasons.clone();
            self.store.record_attempt(index, record, max_attempts)?;
            snapshots.push(snapshot);

            if let Some(image) = approved_image {
                let path = self.store.layout().approved_frame(index);
                write_bytes_atomic(&path, &image.encode_png()?)?;
                self.store.approve(index, path)?;
                tracing::info!(attempt, "frame approved");
                self.write_metrics(index, snapshots)?;
                return Ok(FrameEnd::Terminal);
            }

            let usage = self.store.state().frame(index)?.strategy_usage();
            match next_step(&reasons, attempt, max_attempts, &usage) {
                LadderStep::Retry(next) => {
                    tracing::info!(attempt, ?reasons, next = %next, "retrying frame");
                    self.store.retry(index)?;
                }
                LadderStep::Reject(reasons) => {
                    return self.finish(index, FrameStatus::Rejected, reasons, snapshots);
                }
                LadderStep::Fail(reasons) => {
                    return self.finish(index, FrameStatus::Failed, reasons, snapshots);
                }
            }
        }
    }

    /// Moves the frame to `rejected` or `failed` and writes its metrics record.
    fn finish(
        &mut self,
        index: FrameIndex,
        status: FrameStatus,
        mut reasons: Vec<ReasonCode>,
        snapshots: Vec<AttemptMetrics>,
    ) -> SpriteGateResult<FrameEnd> {
        if status == FrameStatus::Rejected {
            tracing::warn!(frame = %index, ?reasons, "frame rejected");
            self.store.reject(index, reasons)?;
        } else {
            if reasons.first() != Some(&ReasonCode::MaxAttemptsReached) {
                reasons.insert(0, ReasonCode::MaxAttemptsReached);
            }
            tracing::warn!(frame = %index, ?reasons, "frame failed");
            self.store.fail_frame(index, reasons)?;
        }
        self.write_metrics(index, snapshots)?;
        Ok(FrameEnd::Terminal)
    }

    fn write_metrics(
        &self,
        index: FrameIndex,
        snapshots: Vec<AttemptMetrics>,
    ) -> SpriteGateResult<()> {
        let state = self.store.state();
        let record = FrameMetricsRecord::new(&state.run_id, state.frame(index)?, snapshots);
        record.write(self.store.layout())?;
        Ok(())
    }

    fn prompt_hash(&self, index: FrameIndex, attempt: u32, strategy: Strategy) -> String {
        let mut h = StableHash::new();
        h.write_str(&self.store.state().run_id);
        h.write_str(&self.cfg.move_type);
        h.write_u32(index.0);
        h.write_u32(attempt);
        h.write_str(strategy.name());
        if let Some([r, g, b]) = self.chroma_key {
            h.write_u32(u32::from_be_bytes([0, r, g, b]));
        }
        h.finish_hex()
    }

    fn summary(&self) -> RunSummary {
        let state = self.store.state();
        let count = |s: FrameStatus| state.frames.iter().filter(|f| f.status == s).count() as u32;
        RunSummary {
            status: state.status,
            approved: count(FrameStatus::Approved),
            rejected: count(FrameStatus::Rejected),
            failed: count(FrameStatus::Failed),
            total_attempts: state.total_attempts,
            stop_reason: state.stop_reason.clone(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/run.rs"]
mod tests;
