use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::ballot::{CandidateId, Roster};
use crate::results::{TransferSource, TransferTarget, VoteTransfer};

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord)]
pub(crate) enum Source {
    Initial,
    From(CandidateId),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord)]
pub(crate) enum Target {
    To(CandidateId),
    Exhausted,
}

/// Records, per round, how much vote value moved between candidates. Keys are
/// ordered so snapshots come out in a stable order.
#[derive(Debug, Default)]
pub(crate) struct TallyTransfers {
    rounds: BTreeMap<u32, BTreeMap<(Source, Target), Decimal>>,
}

impl TallyTransfers {
    pub(crate) fn add(&mut self, round: u32, from: Source, to: Target, value: Decimal) {
        if value.is_zero() {
            return;
        }
        *self
            .rounds
            .entry(round)
            .or_default()
            .entry((from, to))
            .or_insert(Decimal::ZERO) += value;
    }

    pub(crate) fn round_snapshot(&self, round: u32, roster: &Roster) -> Vec<VoteTransfer> {
        let Some(entries) = self.rounds.get(&round) else {
            return Vec::new();
        };
        entries
            .iter()
            .map(|((from, to), value)| VoteTransfer {
                from: match from {
                    Source::Initial => TransferSource::Initial,
                    Source::From(c) => TransferSource::Candidate(roster.name(*c).to_string()),
                },
                to: match to {
                    Target::To(c) => TransferTarget::Candidate(roster.name(*c).to_string()),
                    Target::Exhausted => TransferTarget::Exhausted,
                },
                value: *value,
            })
            .collect()
    }
}
