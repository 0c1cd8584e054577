//! spritegate drives an automated generation-audit-retry loop for sprite animation frames.
//!
//! For each frame it asks a [`GenerationAdapter`] for a candidate image, runs it through
//! structural hard gates, aligns it to the anchor's contact patch, scores it with perceptual
//! soft metrics and either approves it, retries with an escalated [`Strategy`], or gives up on
//! the frame. Run-level stop conditions halt runaway runs and leave a [`Diagnostic`] behind.
//!
//! - Load an [`AuditConfig`]
//! - Create an [`Engine`] with [`Engine::start`] (or [`Engine::resume`])
//! - Call [`Engine::run`] and inspect the [`RunSummary`] or the [`RunStateStore`]
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod align;
pub(crate) mod anchor;
pub(crate) mod config;
pub(crate) mod engine;
pub(crate) mod gates;
pub(crate) mod metrics;
pub(crate) mod report;
pub(crate) mod retry;
pub(crate) mod scoring;
pub(crate) mod state;

pub use crate::foundation::core::{FrameIndex, PixelRect, Rgb, RgbaFrame};
pub use crate::foundation::error::{SpriteGateError, SpriteGateResult};

pub use crate::align::contact_patch::{Aligned, Alignment, align, shift_frame};
pub use crate::anchor::analysis::{AnalyzeOpts, AnchorAnalysis, analyze};
pub use crate::anchor::chroma::{
    DEFAULT_CHROMA_CANDIDATES, extract_palette, palette_contains, select_chroma_key,
};
pub use crate::config::audit::{
    AlignConfig, AlignMode, AuditConfig, GateConfig, OrphanConfig, RetryConfig, SsimConfig,
    TemporalConfig, TemporalRule, ThresholdConfig, WeightConfig,
};
pub use crate::engine::adapter::{
    AdapterError, GenerationAdapter, GenerationRequest, ScriptedAdapter,
};
pub use crate::engine::auditor::{AuditContext, AuditReport, audit_candidate};
pub use crate::engine::run::{Engine, EngineOpts, RunSummary};
pub use crate::gates::hard::{
    GateCheck, HardGate, HardGateFailure, HardGateOpts, HardGatePass, evaluate_hard_gates,
};
pub use crate::gates::reason::{ReasonCode, Severity};
pub use crate::metrics::orphan::{OrphanClass, OrphanReport, orphan_pixels};
pub use crate::metrics::palette::{
    OffPaletteColor, PaletteCoverage, PaletteReport, palette_fidelity,
};
pub use crate::metrics::ssim::{SsimOpts, SsimReport, ssim};
pub use crate::metrics::suite::{SoftMetrics, SuiteInput, run_soft_metrics};
pub use crate::metrics::temporal::{TemporalOutcome, temporal_coherence, temporal_delta};
pub use crate::report::diagnostics::{
    Confidence, Diagnostic, FailureCodeSummary, FrameBreakdown, FrameDiagnostic, RootCause,
    diagnose,
};
pub use crate::report::metrics_record::{AttemptMetrics, FrameMetricsRecord, HardFailureSummary};
pub use crate::report::redact::{REDACTED, redact};
pub use crate::retry::ladder::{
    LadderStep, Strategy, StrategyUsage, next_step, primary_strategy, select_strategy,
};
pub use crate::retry::stop::{
    DEFAULT_CIRCUIT_BREAKER, RunTally, StopCondition, StopReason, circuit_breaker, evaluate_stop,
};
pub use crate::scoring::composite::{
    Category, CategoryInputs, CategoryScore, CompositeScore, RankBand, composite,
};
pub use crate::state::model::{
    AttemptOutcome, AttemptRecord, FrameState, FrameStatus, RUN_STATE_VERSION, RunState,
    RunStatus,
};
pub use crate::state::store::{RunLayout, RunStateStore};
