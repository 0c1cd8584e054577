//! The generation-audit-retry engine: adapter seam, per-candidate audit and the run loop.

pub(crate) mod adapter;
pub(crate) mod auditor;
pub(crate) mod run;
