//! Deterministic round-by-round tabulation for ranked-choice contests.
//!
//! Given a candidate roster, a set of ranked ballots and a
//! [`TabulationConfig`], [`tabulate`] produces the full history of the count:
//! per-round tallies, eliminations and winners, vote transfers, residual
//! surplus, and a per-ballot audit trail. Identical inputs always produce
//! identical outputs, down to the decimals.

mod ballot;
mod batch;
mod config;
mod decimal;
mod engine;
mod events;
mod interpreter;
mod results;
mod sequential;
mod threshold;
mod tiebreak;
mod transfers;

pub use rust_decimal::Decimal;

pub use ballot::{Ballot, Candidate};
pub use config::{
    generate_candidate_permutation, OvervoteRule, TabulationConfig, TieBreakMode,
    WinnerElectionMode,
};
pub use events::{
    CancelToken, EliminationKind, LogObserver, NullObserver, TabulationEvent, TabulationObserver,
};
pub use results::{
    BallotAudit, BallotOutcome, ExhaustReason, RoundRecord, TabulationError, TabulationResult,
    TransferSource, TransferTarget, VoteTransfer,
};
pub use sequential::{tabulate_sequential, SequentialOutcome};
pub use tiebreak::{TieBreakRequest, TieResolver};

use engine::Engine;

/// Collaborators a tabulation can be wired to. All of them are optional; the
/// default runs silently, without interactive tie-breaks or cancellation.
#[derive(Default)]
pub struct TabulationOptions<'a> {
    pub observer: Option<&'a mut dyn TabulationObserver>,
    pub resolver: Option<&'a mut dyn TieResolver>,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> TabulationOptions<'a> {
    /// Short-lived copy handing the same collaborators to one engine run.
    pub(crate) fn reborrow<'b>(&'b mut self) -> TabulationOptions<'b>
    where
        'a: 'b,
    {
        let observer: Option<&'b mut dyn TabulationObserver> = match &mut self.observer {
            Some(observer) => Some(&mut **observer),
            None => None,
        };
        let resolver: Option<&'b mut dyn TieResolver> = match &mut self.resolver {
            Some(resolver) => Some(&mut **resolver),
            None => None,
        };
        TabulationOptions {
            observer,
            resolver,
            cancel: self.cancel,
        }
    }
}

/// The outcome of [`run_contest`]: sequential contests produce one result per
/// seat, everything else produces a single result.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ContestOutcome {
    Single(TabulationResult),
    Sequential(SequentialOutcome),
}

/// Tabulates one contest with default options.
pub fn tabulate(
    candidates: &[Candidate],
    ballots: &[Ballot],
    config: &TabulationConfig,
) -> Result<TabulationResult, TabulationError> {
    tabulate_with(candidates, ballots, config, TabulationOptions::default())
}

/// Tabulates one contest. Sequential winner-takes-all contests are refused
/// here; they go through [`tabulate_sequential`].
pub fn tabulate_with<'a>(
    candidates: &[Candidate],
    ballots: &[Ballot],
    config: &'a TabulationConfig,
    options: TabulationOptions<'a>,
) -> Result<TabulationResult, TabulationError> {
    if config.winner_election_mode == WinnerElectionMode::MultiSeatSequentialWinnerTakesAll {
        return Err(TabulationError::ConfigInvalid(
            "sequential winner-takes-all contests run through tabulate_sequential".to_string(),
        ));
    }
    run_single(candidates, ballots, config, options)
}

/// Dispatches on the winner election mode, running the sequential driver when
/// the contest calls for it.
pub fn run_contest<'a>(
    candidates: &[Candidate],
    ballots: &[Ballot],
    config: &'a TabulationConfig,
    options: TabulationOptions<'a>,
) -> Result<ContestOutcome, TabulationError> {
    if config.winner_election_mode == WinnerElectionMode::MultiSeatSequentialWinnerTakesAll {
        tabulate_sequential(candidates, ballots, config, options).map(ContestOutcome::Sequential)
    } else {
        tabulate_with(candidates, ballots, config, options).map(ContestOutcome::Single)
    }
}

pub(crate) fn run_single<'a>(
    candidates: &[Candidate],
    ballots: &[Ballot],
    config: &'a TabulationConfig,
    options: TabulationOptions<'a>,
) -> Result<TabulationResult, TabulationError> {
    let TabulationOptions {
        mut observer,
        mut resolver,
        cancel,
    } = options;
    let mut fallback = NullObserver;
    let observer: &mut dyn TabulationObserver = match &mut observer {
        Some(observer) => &mut **observer,
        None => &mut fallback,
    };
    let resolver: Option<&mut dyn TieResolver> = match &mut resolver {
        Some(resolver) => Some(&mut **resolver),
        None => None,
    };
    Engine::new(candidates, ballots, config, observer, resolver, cancel)?.tabulate()
}
