//! Versioned run state and its crash-safe store.

pub(crate) mod model;
pub(crate) mod store;
