//! Reference-frame analysis: contact points and transparency strategy.

pub(crate) mod analysis;
pub(crate) mod chroma;
