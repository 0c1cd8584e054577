//! Deterministic spatial alignment of candidates to the anchor.

pub(crate) mod contact_patch;
