//! Weighted composite scoring and rank bands.

pub(crate) mod composite;
