use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use rust_decimal::Decimal;

use crate::results::ExhaustReason;

/// How a candidate left the contest.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum EliminationKind {
    UndeclaredWriteIns,
    BelowMinimumThreshold,
    /// The running total of all lower tallies could not reach the next
    /// highest count.
    Batch {
        running_total: Decimal,
        next_highest: Decimal,
    },
    Lowest,
}

/// Structured notifications emitted while the engine runs. The engine never
/// formats log messages itself; observers decide how to render these.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TabulationEvent {
    RoundStarted {
        round: u32,
    },
    ThresholdSet {
        round: u32,
        threshold: Decimal,
    },
    CandidateTallied {
        round: u32,
        candidate: String,
        votes: Decimal,
    },
    CandidateElected {
        round: u32,
        candidate: String,
        votes: Decimal,
    },
    CandidateEliminated {
        round: u32,
        candidate: String,
        votes: Decimal,
        kind: EliminationKind,
    },
    SurplusTransferScheduled {
        round: u32,
        winner: String,
        surplus_fraction: Decimal,
    },
    ResidualSurplusRecorded {
        round: u32,
        winner: String,
        amount: Decimal,
    },
    BallotExhausted {
        round: u32,
        ballot: usize,
        reason: ExhaustReason,
    },
    TieBreakResolved {
        round: u32,
        tied: Vec<String>,
        selected: String,
        selecting_winner: bool,
        explanation: String,
    },
}

pub trait TabulationObserver {
    fn on_event(&mut self, event: &TabulationEvent);
}

/// Drops every event.
#[derive(Debug, Default)]
pub struct NullObserver;

impl TabulationObserver for NullObserver {
    fn on_event(&mut self, _event: &TabulationEvent) {}
}

/// Renders events through the `log` facade, one line per event.
#[derive(Debug, Default)]
pub struct LogObserver;

impl TabulationObserver for LogObserver {
    fn on_event(&mut self, event: &TabulationEvent) {
        match event {
            TabulationEvent::RoundStarted { round } => info!("Round: {}", round),
            TabulationEvent::ThresholdSet { threshold, .. } => {
                info!("Winning threshold set to {}.", threshold)
            }
            TabulationEvent::CandidateTallied {
                candidate, votes, ..
            } => info!("Candidate \"{}\" got {} vote(s).", candidate, votes),
            TabulationEvent::CandidateElected {
                round,
                candidate,
                votes,
            } => info!(
                "Candidate \"{}\" won in round {} with {} vote(s).",
                candidate, round, votes
            ),
            TabulationEvent::CandidateEliminated {
                round,
                candidate,
                votes,
                kind,
            } => match kind {
                EliminationKind::UndeclaredWriteIns => info!(
                    "Eliminated \"{}\" in round {} because it represents undeclared write-ins. \
                     It had {} vote(s).",
                    candidate, round, votes
                ),
                EliminationKind::BelowMinimumThreshold => info!(
                    "Eliminated \"{}\" in round {}: {} vote(s) is below the minimum threshold.",
                    candidate, round, votes
                ),
                EliminationKind::Batch {
                    running_total,
                    next_highest,
                } => info!(
                    "Batch-eliminated \"{}\" in round {}. The running total was {} vote(s) and \
                     the next-highest count was {} vote(s).",
                    candidate, round, running_total, next_highest
                ),
                EliminationKind::Lowest => info!(
                    "Candidate \"{}\" was eliminated in round {} with {} vote(s).",
                    candidate, round, votes
                ),
            },
            TabulationEvent::SurplusTransferScheduled {
                winner,
                surplus_fraction,
                ..
            } => info!(
                "Candidate \"{}\" won with a surplus fraction of {}.",
                winner, surplus_fraction
            ),
            TabulationEvent::ResidualSurplusRecorded { winner, amount, .. } => {
                info!("{} had residual surplus of {}.", winner, amount)
            }
            TabulationEvent::BallotExhausted {
                round,
                ballot,
                reason,
            } => debug!("Ballot {} exhausted in round {}: {}.", ballot, round, reason),
            TabulationEvent::TieBreakResolved {
                round,
                tied,
                selected,
                explanation,
                ..
            } => info!(
                "Tie in round {} between {} resolved for \"{}\": {}.",
                round,
                tied.join(", "),
                selected,
                explanation
            ),
        }
    }
}

/// Cooperative cancellation flag. The engine checks it once per round and
/// aborts with `TabulationError::Cancelled` when set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
