//! Structural hard gates and the reason-code vocabulary shared by every gate.

pub(crate) mod hard;
pub(crate) mod reason;
