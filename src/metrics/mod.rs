//! Soft quality metrics: identity (SSIM), palette fidelity, orphan-pixel noise and temporal
//! coherence, plus the suite that runs them together.

pub(crate) mod orphan;
pub(crate) mod palette;
pub(crate) mod ssim;
pub(crate) mod suite;
pub(crate) mod temporal;
