use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

/// Why a ballot stopped counting.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ExhaustReason {
    Undervote,
    Overvote,
    DuplicateCandidate(String),
    NoContinuingCandidates,
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustReason::Undervote => write!(f, "undervote"),
            ExhaustReason::Overvote => write!(f, "overvote"),
            ExhaustReason::DuplicateCandidate(name) => write!(f, "duplicate candidate: {}", name),
            ExhaustReason::NoContinuingCandidates => write!(f, "no continuing candidates"),
        }
    }
}

/// One ballot's disposition in one round. Exhausted entries repeat in every
/// later round with the value the ballot carried when it exhausted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotOutcome {
    Counted { candidate: String, value: Decimal },
    Exhausted { reason: ExhaustReason, value: Decimal },
}

/// The full audit trail for one ballot, one entry per round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotAudit {
    pub id: Option<String>,
    pub rounds: Vec<BallotOutcome>,
}

/// Where a transferred vote came from. `Initial` is the synthetic source for
/// the first time a ballot counts for anyone.
#[derive(Eq, PartialEq, Debug, Clone, PartialOrd, Ord)]
pub enum TransferSource {
    Initial,
    Candidate(String),
}

/// Where a transferred vote went.
#[derive(Eq, PartialEq, Debug, Clone, PartialOrd, Ord)]
pub enum TransferTarget {
    Candidate(String),
    Exhausted,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteTransfer {
    pub from: TransferSource,
    pub to: TransferTarget,
    pub value: Decimal,
}

/// Everything that happened in one round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundRecord {
    pub round: u32,
    /// Votes per candidate, including past-winner plateaus in multi-seat
    /// contests.
    pub tally: BTreeMap<String, Decimal>,
    pub elected: Vec<String>,
    pub eliminated: Vec<String>,
    /// How votes moved while this round was tallied.
    pub transfers: Vec<VoteTransfer>,
    /// Running total of value lost to truncation during surplus transfers.
    pub residual_surplus: Decimal,
}

/// The complete, reproducible outcome of one tabulation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TabulationResult {
    pub threshold: Decimal,
    /// Winners in the order they were declared.
    pub winners: Vec<String>,
    pub rounds: Vec<RoundRecord>,
    pub winning_rounds: Vec<(String, u32)>,
    pub elimination_rounds: Vec<(String, u32)>,
    pub ballots: Vec<BallotAudit>,
    /// Per-precinct round tallies, present when by-precinct tabulation is on.
    pub precinct_tallies: BTreeMap<String, Vec<BTreeMap<String, Decimal>>>,
}

/// Errors that stop a tabulation. The engine never silently recovers from an
/// accounting discrepancy.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TabulationError {
    /// The configuration cannot be tabulated as given.
    ConfigInvalid(String),
    /// The cooperative cancel signal was observed; no partial results exist.
    Cancelled,
    /// An internal accounting check failed. This signals a bug, not bad input.
    InternalInvariantViolation(String),
    /// An interactive tie-break mode needs a resolution the caller did not
    /// provide.
    TieBreakInputRequired { round: u32, candidates: Vec<String> },
}

impl fmt::Display for TabulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabulationError::ConfigInvalid(msg) => write!(f, "invalid configuration: {}", msg),
            TabulationError::Cancelled => write!(f, "tabulation was cancelled"),
            TabulationError::InternalInvariantViolation(msg) => {
                write!(f, "internal invariant violation: {}", msg)
            }
            TabulationError::TieBreakInputRequired { round, candidates } => write!(
                f,
                "tie-break in round {} between {} requires an interactive resolution",
                round,
                candidates.join(", ")
            ),
        }
    }
}

impl std::error::Error for TabulationError {}
