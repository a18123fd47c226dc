use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use crate::config::{OvervoteRule, TabulationConfig};
use crate::results::{ExhaustReason, TabulationError};

/// A candidate in the contest. Excluded candidates stay in the roster but
/// never receive votes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub code: Option<String>,
    pub excluded: bool,
}

impl Candidate {
    pub fn new(name: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            code: None,
            excluded: false,
        }
    }

    pub fn excluded(name: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            code: None,
            excluded: true,
        }
    }
}

/// One voter's ranked expression of preferences. Ranks start at 1, may be
/// sparse, and a rank may carry several marks when the input format allows it.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Ballot {
    pub id: Option<String>,
    pub precinct: Option<String>,
    pub rankings: BTreeMap<u32, Vec<String>>,
}

impl Ballot {
    pub fn new() -> Ballot {
        Ballot::default()
    }

    /// One candidate per rank, in preference order.
    pub fn ranked(names: &[&str]) -> Ballot {
        let mut ballot = Ballot::new();
        for (idx, name) in names.iter().enumerate() {
            ballot.rankings.insert(idx as u32 + 1, vec![name.to_string()]);
        }
        ballot
    }

    pub fn rank(mut self, rank: u32, names: &[&str]) -> Ballot {
        self.rankings
            .insert(rank, names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn with_id(mut self, id: &str) -> Ballot {
        self.id = Some(id.to_string());
        self
    }

    pub fn in_precinct(mut self, precinct: &str) -> Ballot {
        self.precinct = Some(precinct.to_string());
        self
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
pub(crate) struct CandidateId(pub(crate) u32);

/// The interned candidate set for one tabulation. Candidates are assigned ids
/// in lexicographic name order so that every id-ordered iteration is also
/// name-ordered; the explicit overvote label is interned last and never joins
/// the continuing set.
pub(crate) struct Roster {
    names: Vec<String>,
    ids: HashMap<String, CandidateId>,
    excluded: Vec<bool>,
    declared: u32,
    pub(crate) overvote: Option<CandidateId>,
    pub(crate) undeclared: Option<CandidateId>,
}

impl Roster {
    pub(crate) fn build(
        candidates: &[Candidate],
        config: &TabulationConfig,
    ) -> Result<Roster, TabulationError> {
        let mut entries: Vec<(String, bool)> = candidates
            .iter()
            .map(|c| (c.name.clone(), c.excluded))
            .collect();
        if let Some(label) = &config.undeclared_write_in_label {
            if !entries.iter().any(|(name, _)| name == label) {
                entries.push((label.clone(), false));
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut names: Vec<String> = Vec::with_capacity(entries.len() + 1);
        let mut excluded: Vec<bool> = Vec::with_capacity(entries.len() + 1);
        let mut ids: HashMap<String, CandidateId> = HashMap::new();
        for (name, is_excluded) in entries {
            if name == config.explicit_overvote_label {
                return Err(TabulationError::ConfigInvalid(format!(
                    "candidate \"{}\" conflicts with the explicit overvote label",
                    name
                )));
            }
            if ids
                .insert(name.clone(), CandidateId(names.len() as u32))
                .is_some()
            {
                return Err(TabulationError::ConfigInvalid(format!(
                    "candidate \"{}\" is declared twice",
                    name
                )));
            }
            names.push(name);
            excluded.push(is_excluded);
        }

        let undeclared = config
            .undeclared_write_in_label
            .as_ref()
            .and_then(|label| ids.get(label).copied());

        let overvote_id = CandidateId(names.len() as u32);
        ids.insert(config.explicit_overvote_label.clone(), overvote_id);
        names.push(config.explicit_overvote_label.clone());
        excluded.push(false);

        Ok(Roster {
            names,
            ids,
            excluded,
            declared: candidates.len() as u32,
            overvote: Some(overvote_id),
            undeclared,
        })
    }

    pub(crate) fn id(&self, name: &str) -> Option<CandidateId> {
        self.ids.get(name).copied()
    }

    pub(crate) fn name(&self, candidate: CandidateId) -> &str {
        &self.names[candidate.0 as usize]
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    pub(crate) fn is_excluded(&self, candidate: CandidateId) -> bool {
        self.excluded[candidate.0 as usize]
    }

    pub(crate) fn declared_count(&self) -> u32 {
        self.declared
    }

    /// Candidates that can be elected or eliminated.
    pub(crate) fn eligible_count(&self) -> u32 {
        (0..self.names.len() as u32)
            .map(CandidateId)
            .filter(|c| Some(*c) != self.overvote && !self.is_excluded(*c))
            .count() as u32
    }
}

/// The immutable, interned form of one ballot.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) struct BallotRanks {
    pub(crate) id: Option<String>,
    pub(crate) precinct: Option<u32>,
    /// Ascending ranks; every mark set is non-empty and duplicate-free.
    pub(crate) ranks: Vec<(u32, Vec<CandidateId>)>,
}

/// Per-tabulation scratch state for one ballot, kept in an array parallel to
/// the interned ballots so a fresh run just rebuilds this array.
#[derive(Debug, Clone)]
pub(crate) struct BallotState {
    pub(crate) current: Option<CandidateId>,
    pub(crate) value: Decimal,
    pub(crate) exhausted: Option<ExhaustReason>,
    /// Fractional value retained by each winner this ballot helped elect.
    pub(crate) winner_shares: BTreeMap<CandidateId, Decimal>,
}

impl BallotState {
    pub(crate) fn fresh() -> BallotState {
        BallotState {
            current: None,
            value: Decimal::ONE,
            exhausted: None,
            winner_shares: BTreeMap::new(),
        }
    }
}

pub(crate) fn intern_ballots(
    ballots: &[Ballot],
    roster: &Roster,
    config: &TabulationConfig,
) -> Result<(Vec<BallotRanks>, Vec<String>), TabulationError> {
    let mut precinct_names: Vec<String> = ballots
        .iter()
        .filter_map(|b| b.precinct.clone())
        .collect();
    precinct_names.sort();
    precinct_names.dedup();

    let mut interned = Vec::with_capacity(ballots.len());
    for ballot in ballots {
        let mut ranks: Vec<(u32, Vec<CandidateId>)> = Vec::new();
        for (rank, marks) in &ballot.rankings {
            if *rank == 0 {
                return Err(TabulationError::ConfigInvalid(
                    "ballot ranks start at 1".to_string(),
                ));
            }
            if marks.is_empty() {
                continue;
            }
            let mut ids: Vec<CandidateId> = Vec::with_capacity(marks.len());
            for mark in marks {
                let id = roster.id(mark).ok_or_else(|| {
                    TabulationError::ConfigInvalid(format!(
                        "unrecognized candidate \"{}\" on a ballot",
                        mark
                    ))
                })?;
                if Some(id) == roster.overvote
                    && config.overvote_rule == OvervoteRule::ExhaustIfMultipleContinuing
                {
                    return Err(TabulationError::ConfigInvalid(
                        "the explicit overvote label cannot be combined with the \
                         exhaust-if-multiple-continuing rule"
                            .to_string(),
                    ));
                }
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            ranks.push((*rank, ids));
        }
        let precinct = ballot
            .precinct
            .as_ref()
            .and_then(|p| precinct_names.binary_search(p).ok())
            .map(|idx| idx as u32);
        interned.push(BallotRanks {
            id: ballot.id.clone(),
            precinct,
            ranks,
        });
    }
    Ok((interned, precinct_names))
}
