//! Audit configuration consumed from the run manifest.

pub(crate) mod audit;
