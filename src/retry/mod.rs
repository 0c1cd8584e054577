//! Retry strategy selection and run-level stop conditions.

pub(crate) mod ladder;
pub(crate) mod stop;
