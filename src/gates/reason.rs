/// Machine-readable reason attached to a failed attempt or a non-approved frame.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    // Hard gates.
    FileSizeOutOfBounds,
    Undecodable,
    NoAlphaChannel,
    ColorDepthMismatch,
    DimensionMismatch,
    FullyTransparent,

    // Soft gates.
    IdentityDrift,
    PaletteDrift,
    OrphanNoise,
    TemporalFlicker,
    BaselineDrift,
    CompositeBelowMinimum,
    AdapterFailure,

    // Terminal frame outcome.
    MaxAttemptsReached,
}

/// Severity class of a reason code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hard,
    Soft,
    Terminal,
}

impl ReasonCode {
    pub fn severity(self) -> Severity {
        use ReasonCode::*;
        match self {
            FileSizeOutOfBounds | Undecodable | NoAlphaChannel | ColorDepthMismatch
            | DimensionMismatch | FullyTransparent => Severity::Hard,
            IdentityDrift | PaletteDrift | OrphanNoise | TemporalFlicker | BaselineDrift
            | CompositeBelowMinimum | AdapterFailure => Severity::Soft,
            MaxAttemptsReached => Severity::Terminal,
        }
    }

    pub fn is_hard(self) -> bool {
        self.severity() == Severity::Hard
    }

    /// Hard failures caused by a misbehaving generation adapter rather than a bad generation.
    ///
    /// Retrying with another prompt cannot fix these.
    pub fn is_adapter_fault(self) -> bool {
        matches!(
            self,
            ReasonCode::DimensionMismatch | ReasonCode::ColorDepthMismatch
        )
    }

    /// Stable wire name, e.g. `IDENTITY_DRIFT`.
    pub fn as_str(self) -> &'static str {
        use ReasonCode::*;
        match self {
            FileSizeOutOfBounds => "FILE_SIZE_OUT_OF_BOUNDS",
            Undecodable => "UNDECODABLE",
            NoAlphaChannel => "NO_ALPHA_CHANNEL",
            ColorDepthMismatch => "COLOR_DEPTH_MISMATCH",
            DimensionMismatch => "DIMENSION_MISMATCH",
            FullyTransparent => "FULLY_TRANSPARENT",
            IdentityDrift => "IDENTITY_DRIFT",
            PaletteDrift => "PALETTE_DRIFT",
            OrphanNoise => "ORPHAN_NOISE",
            TemporalFlicker => "TEMPORAL_FLICKER",
            BaselineDrift => "BASELINE_DRIFT",
            CompositeBelowMinimum => "COMPOSITE_BELOW_MINIMUM",
            AdapterFailure => "ADAPTER_FAILURE",
            MaxAttemptsReached => "MAX_ATTEMPTS_REACHED",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gates/reason.rs"]
mod tests;
