use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

use crate::foundation::core::{FrameIndex, Rgb};
use crate::retry::ladder::Strategy;

/// One generation request handed to a [`GenerationAdapter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub run_id: String,
    pub frame: FrameIndex,
    /// 1-based attempt number within the frame.
    pub attempt: u32,
    pub strategy: Strategy,
    /// Hash identifying the prompt and strategy. The prompt text itself stays with the adapter.
    pub prompt_hash: String,
    /// Background color to generate on when the model cannot emit transparency.
    pub chroma_key: Option<Rgb>,
    /// Approved artifact of the previous frame, for continuity strategies.
    pub previous_approved: Option<PathBuf>,
}

/// Failure reported by an adapter instead of an image.
///
/// These are data, not control flow: the engine records them as `ADAPTER_FAILURE` attempts.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum AdapterError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    #[error("service refused the request: {0}")]
    Refused(String),
}

/// Source of encoded candidate images.
///
/// Calls are made sequentially, one attempt at a time, in frame order.
pub trait GenerationAdapter {
    /// Produce encoded image bytes (normally PNG) for `req`.
    fn generate(&mut self, req: &GenerationRequest) -> Result<Vec<u8>, AdapterError>;
}

/// Adapter that replays queued responses per frame. Intended for tests and dry runs.
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    scripts: BTreeMap<FrameIndex, VecDeque<Result<Vec<u8>, AdapterError>>>,
    fallback: Option<Vec<u8>>,
    requests: Vec<GenerationRequest>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response returned when a frame has no queued response left.
    pub fn with_fallback(mut self, bytes: Vec<u8>) -> Self {
        self.fallback = Some(bytes);
        self
    }

    /// Queue `response` for the next unanswered attempt of `frame`.
    pub fn push(&mut self, frame: FrameIndex, response: Result<Vec<u8>, AdapterError>) {
        self.scripts.entry(frame).or_default().push_back(response);
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> &[GenerationRequest] {
        &self.requests
    }
}

impl GenerationAdapter for ScriptedAdapter {
    fn generate(&mut self, req: &GenerationRequest) -> Result<Vec<u8>, AdapterError> {
        self.requests.push(req.clone());
        if let Some(next) = self
            .scripts
            .get_mut(&req.frame)
            .and_then(VecDeque::pop_front)
        {
            return next;
        }
        self.fallback.clone().ok_or_else(|| {
            AdapterError::Refused(format!("no scripted response for frame {}", req.frame))
        })
    }
}
