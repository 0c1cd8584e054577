use std::collections::BTreeMap;

use crate::gates::reason::ReasonCode;

/// Generation strategy requested from the adapter for one attempt.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// First attempt of a frame.
    Baseline,
    SeedReroll,
    TightenNegative,
    IdentityRescue,
    ReAnchor,
    PreviousFrameLock,
    PostProcess,
    ManualReview,
}

impl Strategy {
    /// Retry strategies in escalation order.
    pub const LADDER: [Self; 7] = [
        Self::SeedReroll,
        Self::TightenNegative,
        Self::IdentityRescue,
        Self::ReAnchor,
        Self::PreviousFrameLock,
        Self::PostProcess,
        Self::ManualReview,
    ];

    /// Per-frame usage cap; `None` is unbounded.
    pub fn cap(self) -> Option<u32> {
        match self {
            Self::Baseline => Some(1),
            Self::SeedReroll => Some(3),
            Self::TightenNegative
            | Self::IdentityRescue
            | Self::ReAnchor
            | Self::PreviousFrameLock => Some(2),
            Self::PostProcess => Some(1),
            Self::ManualReview => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::SeedReroll => "seed_reroll",
            Self::TightenNegative => "tighten_negative",
            Self::IdentityRescue => "identity_rescue",
            Self::ReAnchor => "re_anchor",
            Self::PreviousFrameLock => "previous_frame_lock",
            Self::PostProcess => "post_process",
            Self::ManualReview => "manual_review",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Reason codes in priority order with the strategy that addresses each.
///
/// Hard codes come before soft codes; the first code present in a failure picks the strategy.
const PRIORITY: [(ReasonCode, Strategy); 13] = [
    (ReasonCode::DimensionMismatch, Strategy::SeedReroll),
    (ReasonCode::ColorDepthMismatch, Strategy::SeedReroll),
    (ReasonCode::NoAlphaChannel, Strategy::TightenNegative),
    (ReasonCode::FullyTransparent, Strategy::SeedReroll),
    (ReasonCode::Undecodable, Strategy::SeedReroll),
    (ReasonCode::FileSizeOutOfBounds, Strategy::SeedReroll),
    (ReasonCode::BaselineDrift, Strategy::ReAnchor),
    (ReasonCode::IdentityDrift, Strategy::IdentityRescue),
    (ReasonCode::TemporalFlicker, Strategy::PreviousFrameLock),
    (ReasonCode::PaletteDrift, Strategy::TightenNegative),
    (ReasonCode::OrphanNoise, Strategy::TightenNegative),
    (ReasonCode::CompositeBelowMinimum, Strategy::SeedReroll),
    (ReasonCode::AdapterFailure, Strategy::SeedReroll),
];

/// How often each strategy was used for one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrategyUsage {
    counts: BTreeMap<Strategy, u32>,
}

impl StrategyUsage {
    pub fn from_strategies(used: impl IntoIterator<Item = Strategy>) -> Self {
        let mut usage = Self::default();
        for s in used {
            usage.record(s);
        }
        usage
    }

    pub fn record(&mut self, strategy: Strategy) {
        *self.counts.entry(strategy).or_default() += 1;
    }

    pub fn used(&self, strategy: Strategy) -> u32 {
        self.counts.get(&strategy).copied().unwrap_or(0)
    }

    pub fn has_budget(&self, strategy: Strategy) -> bool {
        strategy.cap().is_none_or(|cap| self.used(strategy) < cap)
    }
}

/// Strategy mapped to the highest-priority reason code, ignoring usage caps.
pub fn primary_strategy(reasons: &[ReasonCode]) -> Strategy {
    PRIORITY
        .iter()
        .find(|(code, _)| reasons.contains(code))
        .map(|(_, s)| *s)
        .unwrap_or(Strategy::SeedReroll)
}

/// Primary strategy, escalated up the ladder while its budget is used up.
pub fn select_strategy(reasons: &[ReasonCode], usage: &StrategyUsage) -> Strategy {
    let primary = primary_strategy(reasons);
    if usage.has_budget(primary) {
        return primary;
    }
    let start = Strategy::LADDER
        .iter()
        .position(|s| *s == primary)
        .map_or(0, |i| i + 1);
    Strategy::LADDER[start..]
        .iter()
        .copied()
        .find(|s| usage.has_budget(*s))
        .unwrap_or(Strategy::ManualReview)
}

/// What happens to a frame after a failed attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LadderStep {
    Retry(Strategy),
    /// Adapter fault; retrying cannot help.
    Reject(Vec<ReasonCode>),
    /// Attempt budget exhausted.
    Fail(Vec<ReasonCode>),
}

/// Decides the next step for a frame whose latest attempt failed with `reasons`.
///
/// `attempts_used` counts attempts already recorded for the frame, including the failed one.
pub fn next_step(
    reasons: &[ReasonCode],
    attempts_used: u32,
    max_attempts: u32,
    usage: &StrategyUsage,
) -> LadderStep {
    if reasons.iter().any(|r| r.is_adapter_fault()) {
        return LadderStep::Reject(reasons.to_vec());
    }
    if attempts_used >= max_attempts {
        let mut terminal = vec![ReasonCode::MaxAttemptsReached];
        terminal.extend(reasons.iter().filter(|r| **r != ReasonCode::MaxAttemptsReached));
        return LadderStep::Fail(terminal);
    }
    LadderStep::Retry(select_strategy(reasons, usage))
}

#[cfg(test)]
#[path = "../../tests/unit/retry/ladder.rs"]
mod tests;
