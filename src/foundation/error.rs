/// Convenience result type used across spritegate.
pub type SpriteGateResult<T> = Result<T, SpriteGateError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Quality-gate failures are not errors: they are recorded as reason codes on attempt records.
/// This type covers conditions that stop an operation outright.
#[derive(thiserror::Error, Debug)]
pub enum SpriteGateError {
    /// Invalid user-provided configuration or input data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while analyzing image geometry.
    #[error("analysis error: {0}")]
    Analysis(String),

    /// The reference frame has no pixel at or above the alpha threshold.
    #[error("analysis error: anchor is fully transparent at alpha threshold {threshold}")]
    AnchorFullyTransparent {
        /// Alpha threshold used for the scan.
        threshold: u8,
    },

    /// Illegal run/frame state transition or broken run-state invariant.
    #[error("state error: {0}")]
    State(String),

    /// Errors while reading or writing run artifacts.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpriteGateError {
    /// Build a [`SpriteGateError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SpriteGateError::Analysis`] value.
    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    /// Build a [`SpriteGateError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Build a [`SpriteGateError::Persistence`] value.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Build a [`SpriteGateError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for SpriteGateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
