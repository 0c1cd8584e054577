use crate::config::audit::RetryConfig;
use crate::foundation::math::ratio;

/// Default ceiling on total attempts across a run.
pub const DEFAULT_CIRCUIT_BREAKER: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    CircuitBreaker,
    ConsecutiveFails,
    RejectRate,
    RetryRate,
}

impl StopCondition {
    pub fn name(self) -> &'static str {
        match self {
            Self::CircuitBreaker => "circuit_breaker",
            Self::ConsecutiveFails => "consecutive_fails",
            Self::RejectRate => "reject_rate",
            Self::RetryRate => "retry_rate",
        }
    }
}

impl std::fmt::Display for StopCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a run halted early.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StopReason {
    pub condition: StopCondition,
    pub observed: f64,
    pub threshold: f64,
    pub message: String,
}

/// Run-level counters the stop conditions look at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunTally {
    pub total_attempts: u32,
    /// Frames in `approved`, `rejected` or `failed`.
    pub terminal_frames: u32,
    /// Terminal frames in `rejected` or `failed`.
    pub unsuccessful_frames: u32,
    /// Terminal frames that needed more than one attempt.
    pub retried_frames: u32,
    pub consecutive_fails: u32,
}

/// Trips when the run has used `ceiling` attempts or more.
pub fn circuit_breaker(total_attempts: u32, ceiling: u32) -> Option<StopReason> {
    (total_attempts >= ceiling).then(|| StopReason {
        condition: StopCondition::CircuitBreaker,
        observed: f64::from(total_attempts),
        threshold: f64::from(ceiling),
        message: format!("total attempts {total_attempts} reached the ceiling of {ceiling}"),
    })
}

/// Evaluates the stop conditions in priority order; the first match wins.
///
/// Rate conditions are only considered once `min_frames_for_rates` frames are terminal.
pub fn evaluate_stop(tally: &RunTally, cfg: &RetryConfig, ceiling: u32) -> Option<StopReason> {
    if let Some(reason) = circuit_breaker(tally.total_attempts, ceiling) {
        return Some(reason);
    }

    if tally.consecutive_fails >= cfg.max_consecutive_fails {
        return Some(StopReason {
            condition: StopCondition::ConsecutiveFails,
            observed: f64::from(tally.consecutive_fails),
            threshold: f64::from(cfg.max_consecutive_fails),
            message: format!(
                "{} consecutive frames rejected or failed",
                tally.consecutive_fails
            ),
        });
    }

    if tally.terminal_frames < cfg.min_frames_for_rates || tally.terminal_frames == 0 {
        return None;
    }
    let frames = tally.terminal_frames as usize;

    let reject_rate = ratio(tally.unsuccessful_frames as usize, frames);
    if reject_rate >= cfg.max_reject_rate {
        return Some(StopReason {
            condition: StopCondition::RejectRate,
            observed: reject_rate,
            threshold: cfg.max_reject_rate,
            message: format!(
                "{} of {} frames rejected or failed",
                tally.unsuccessful_frames, tally.terminal_frames
            ),
        });
    }

    let retry_rate = ratio(tally.retried_frames as usize, frames);
    if retry_rate >= cfg.max_retry_rate {
        return Some(StopReason {
            condition: StopCondition::RetryRate,
            observed: retry_rate,
            threshold: cfg.max_retry_rate,
            message: format!(
                "{} of {} frames needed a retry",
                tally.retried_frames, tally.terminal_frames
            ),
        });
    }
    None
}

#[cfg(test)]
#[path = "../../tests/unit/retry/stop.rs"]
mod tests;
