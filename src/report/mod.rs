//! Persisted reports: per-frame metric records, halt diagnostics and secret redaction.

pub(crate) mod diagnostics;
pub(crate) mod metrics_record;
pub(crate) mod redact;
