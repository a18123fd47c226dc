use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;

use crate::ballot::{
    intern_ballots, Ballot, BallotRanks, BallotState, Candidate, CandidateId, Roster,
};
use crate::batch::run_batch_elimination;
use crate::config::{generate_candidate_permutation, TabulationConfig, TieBreakMode, WinnerElectionMode};
use crate::decimal::VoteArith;
use crate::events::{CancelToken, EliminationKind, TabulationEvent, TabulationObserver};
use crate::interpreter::{interpret, Disposition, ExhaustKind, RoundView};
use crate::results::{
    BallotAudit, BallotOutcome, ExhaustReason, RoundRecord, TabulationError, TabulationResult,
};
use crate::threshold::winning_threshold;
use crate::tiebreak::{self, TieContext, TieResolver};
use crate::transfers::{Source, TallyTransfers, Target};

type Tally = BTreeMap<CandidateId, Decimal>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum CandidateStatus {
    Continuing,
    Winner,
    Eliminated,
    Excluded,
    Invalid,
}

/// Drives one tabulation from round 1 to completion. The engine owns all
/// mutable state for its lifetime; nothing else may touch it.
pub(crate) struct Engine<'a> {
    config: &'a TabulationConfig,
    roster: Roster,
    ballots: Vec<BallotRanks>,
    states: Vec<BallotState>,
    audits: Vec<Vec<BallotOutcome>>,
    arith: VoteArith,
    current_round: u32,
    round_tallies: Vec<Tally>,
    precinct_names: Vec<String>,
    precinct_tallies: Vec<Vec<Tally>>,
    winner_rounds: Vec<(CandidateId, u32)>,
    winner_of: Vec<Option<u32>>,
    elimination_rounds: Vec<(CandidateId, u32)>,
    eliminated_of: Vec<Option<u32>>,
    transfers: TallyTransfers,
    residuals: Vec<Decimal>,
    threshold: Decimal,
    rng: Option<StdRng>,
    permutation: Vec<CandidateId>,
    observer: &'a mut dyn TabulationObserver,
    resolver: Option<&'a mut dyn TieResolver>,
    cancel: Option<&'a CancelToken>,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(
        candidates: &[Candidate],
        ballots: &[Ballot],
        config: &'a TabulationConfig,
        observer: &'a mut dyn TabulationObserver,
        resolver: Option<&'a mut dyn TieResolver>,
        cancel: Option<&'a CancelToken>,
    ) -> Result<Engine<'a>, TabulationError> {
        config.validate(candidates)?;
        if ballots.is_empty() {
            return Err(TabulationError::ConfigInvalid(
                "at least one ballot is required".to_string(),
            ));
        }
        let roster = Roster::build(candidates, config)?;
        let (interned, precinct_names) = intern_ballots(ballots, &roster, config)?;

        let permutation: Vec<CandidateId> = match config.tiebreak_mode {
            // An empty configured permutation falls back to name order.
            TieBreakMode::UsePermutationInConfig if config.candidate_permutation.is_empty() => {
                (0..roster.len() as u32)
                    .map(CandidateId)
                    .filter(|c| Some(*c) != roster.overvote)
                    .collect()
            }
            TieBreakMode::UsePermutationInConfig => config
                .candidate_permutation
                .iter()
                .map(|name| {
                    roster.id(name).ok_or_else(|| {
                        TabulationError::ConfigInvalid(format!(
                            "unknown candidate \"{}\" in the tie-break permutation",
                            name
                        ))
                    })
                })
                .collect::<Result<_, _>>()?,
            TieBreakMode::GeneratePermutation => {
                let seed = config.random_seed.unwrap_or_default();
                generate_candidate_permutation(candidates, seed)
                    .iter()
                    .filter_map(|name| roster.id(name))
                    .collect()
            }
            _ => Vec::new(),
        };

        let ballot_count = interned.len();
        let candidate_count = roster.len();
        Ok(Engine {
            config,
            roster,
            ballots: interned,
            states: vec![BallotState::fresh(); ballot_count],
            audits: vec![Vec::new(); ballot_count],
            arith: VoteArith::new(config.decimal_places),
            current_round: 0,
            round_tallies: Vec::new(),
            precinct_tallies: vec![Vec::new(); precinct_names.len()],
            precinct_names,
            winner_rounds: Vec::new(),
            winner_of: vec![None; candidate_count],
            elimination_rounds: Vec::new(),
            eliminated_of: vec![None; candidate_count],
            transfers: TallyTransfers::default(),
            residuals: Vec::new(),
            threshold: Decimal::ZERO,
            rng: config.random_seed.map(StdRng::seed_from_u64),
            permutation,
            observer,
            resolver,
            cancel,
        })
    }

    pub(crate) fn tabulate(mut self) -> Result<TabulationResult, TabulationError> {
        while self.should_continue() {
            if let Some(token) = self.cancel {
                if token.is_cancelled() {
                    return Err(TabulationError::Cancelled);
                }
            }
            self.current_round += 1;
            let round = self.current_round;
            self.observer
                .on_event(&TabulationEvent::RoundStarted { round });

            let tally = self.compute_round_tally()?;
            let carried_residual = if round == 1 {
                Decimal::ZERO
            } else {
                self.residuals[(round - 2) as usize]
            };
            self.residuals.push(carried_residual);

            // A multi-seat threshold is frozen after round 1; a single-seat
            // threshold tracks the shrinking active vote count.
            if round == 1 || self.config.number_of_winners == 1 {
                let total: Decimal = tally.values().copied().sum();
                self.threshold = winning_threshold(total, self.config, &self.arith);
                self.observer.on_event(&TabulationEvent::ThresholdSet {
                    round,
                    threshold: self.threshold,
                });
            }

            for (candidate, votes) in &tally {
                let event = TabulationEvent::CandidateTallied {
                    round,
                    candidate: self.roster.name(*candidate).to_string(),
                    votes: *votes,
                };
                self.observer.on_event(&event);
            }

            let by_tally = invert_tally(&tally);
            let winners = self.identify_winners(&tally, &by_tally)?;
            if !winners.is_empty() {
                for &winner in &winners {
                    self.winner_of[winner.0 as usize] = Some(round);
                    self.winner_rounds.push((winner, round));
                    let event = TabulationEvent::CandidateElected {
                        round,
                        candidate: self.roster.name(winner).to_string(),
                        votes: tally.get(&winner).copied().unwrap_or(Decimal::ZERO),
                    };
                    self.observer.on_event(&event);
                }
                if self.config.number_of_winners > 1
                    && !self.config.winner_election_mode.is_bottoms_up()
                {
                    self.transfer_surplus(&tally, &winners);
                }
            } else if (self.winner_rounds.len() as u32) < self.config.number_of_winners
                || self.config.winner_election_mode
                    == WinnerElectionMode::MultiSeatBottomsUpThreshold
                || (self.config.continue_until_two_candidates_remain
                    && (self.elimination_rounds.len() as u32)
                        < self.roster.eligible_count().saturating_sub(2))
            {
                let eliminated = self.select_eliminations(&tally, &by_tally)?;
                if eliminated.is_empty() {
                    return Err(TabulationError::InternalInvariantViolation(
                        "the elimination branch selected no candidate".to_string(),
                    ));
                }
                for &loser in &eliminated {
                    self.eliminated_of[loser.0 as usize] = Some(round);
                    self.elimination_rounds.push((loser, round));
                }
            }

            self.round_tallies.push(tally);
            if self.config.number_of_winners > 1 {
                self.update_past_winner_tallies()?;
            }
        }
        Ok(self.into_result())
    }

    fn should_continue(&self) -> bool {
        let eliminated = self.elimination_rounds.len() as u32;
        let winners = self.winner_rounds.len() as u32;
        // Bottoms-up threshold contests run until the round that elects.
        if self.config.winner_election_mode == WinnerElectionMode::MultiSeatBottomsUpThreshold {
            return winners == 0;
        }
        if self.config.continue_until_two_candidates_remain {
            // Also tabulate one last round after the final elimination to
            // show the redistribution.
            eliminated + winners + 1 < self.roster.eligible_count()
                || self
                    .elimination_rounds
                    .iter()
                    .any(|(_, round)| *round == self.current_round)
        } else {
            // Multi-seat contests tabulate one extra round to show the final
            // surplus moving, unless bottoms-up is enabled.
            winners < self.config.number_of_winners
                || (self.config.number_of_winners > 1
                    && self
                        .winner_rounds
                        .iter()
                        .any(|(_, round)| *round == self.current_round)
                    && !self.config.winner_election_mode.is_bottoms_up())
        }
    }

    fn status(&self, candidate: CandidateId) -> CandidateStatus {
        if self.roster.is_excluded(candidate) {
            CandidateStatus::Excluded
        } else if self.winner_of[candidate.0 as usize].is_some() {
            CandidateStatus::Winner
        } else if self.eliminated_of[candidate.0 as usize].is_some() {
            CandidateStatus::Eliminated
        } else if Some(candidate) == self.roster.overvote {
            CandidateStatus::Invalid
        } else {
            CandidateStatus::Continuing
        }
    }

    fn is_continuing(&self, candidate: CandidateId) -> bool {
        match self.status(candidate) {
            CandidateStatus::Continuing => true,
            CandidateStatus::Winner => self.config.continue_until_two_candidates_remain,
            _ => false,
        }
    }

    fn round_view(&self) -> RoundView {
        RoundView {
            continuing: (0..self.roster.len() as u32)
                .map(|idx| self.is_continuing(CandidateId(idx)))
                .collect(),
            overvote_label: self.roster.overvote,
            overvote_rule: self.config.overvote_rule,
            exhaust_on_duplicate: self.config.exhaust_on_duplicate_candidate,
            max_skipped_ranks: self.config.max_skipped_ranks_allowed,
            max_rankings: self
                .config
                .max_rankings_allowed
                .unwrap_or_else(|| self.roster.declared_count()),
        }
    }

    fn new_tally(&self) -> Tally {
        (0..self.roster.len() as u32)
            .map(CandidateId)
            .filter(|c| self.is_continuing(*c))
            .map(|c| (c, Decimal::ZERO))
            .collect()
    }

    /// Routes every ballot for this round: it stays put, follows its next
    /// preference, or exhausts. By-precinct tallies shadow every increment.
    fn compute_round_tally(&mut self) -> Result<Tally, TabulationError> {
        let round = self.current_round;
        let by_precinct = self.config.tabulate_by_precinct;
        let mut tally = self.new_tally();
        let mut precinct_round: Vec<Tally> = if by_precinct {
            self.precinct_names.iter().map(|_| self.new_tally()).collect()
        } else {
            Vec::new()
        };
        let view = self.round_view();

        for idx in 0..self.ballots.len() {
            if let Some(reason) = self.states[idx].exhausted.clone() {
                let value = self.states[idx].value;
                self.audits[idx].push(BallotOutcome::Exhausted { reason, value });
                continue;
            }
            let precinct = self.ballots[idx].precinct;
            match interpret(&self.ballots[idx], &self.states[idx], &view) {
                Disposition::Stay => {
                    let Some(recipient) = self.states[idx].current else {
                        return Err(TabulationError::InternalInvariantViolation(
                            "a ballot stayed with no recipient".to_string(),
                        ));
                    };
                    let value = self.states[idx].value;
                    increment(&mut tally, recipient, value);
                    if by_precinct {
                        if let Some(p) = precinct {
                            increment(&mut precinct_round[p as usize], recipient, value);
                        }
                    }
                    self.audits[idx].push(BallotOutcome::Counted {
                        candidate: self.roster.name(recipient).to_string(),
                        value,
                    });
                }
                Disposition::Transfer(recipient) => {
                    let value = self.states[idx].value;
                    let from = match self.states[idx].current {
                        Some(previous) => Source::From(previous),
                        None => Source::Initial,
                    };
                    self.transfers.add(round, from, Target::To(recipient), value);
                    self.states[idx].current = Some(recipient);
                    increment(&mut tally, recipient, value);
                    if by_precinct {
                        if let Some(p) = precinct {
                            increment(&mut precinct_round[p as usize], recipient, value);
                        }
                    }
                    self.audits[idx].push(BallotOutcome::Counted {
                        candidate: self.roster.name(recipient).to_string(),
                        value,
                    });
                }
                Disposition::Exhaust(kind) => {
                    let value = self.states[idx].value;
                    let from = match self.states[idx].current {
                        Some(previous) => Source::From(previous),
                        None => Source::Initial,
                    };
                    self.transfers.add(round, from, Target::Exhausted, value);
                    let reason = self.exhaust_reason(kind);
                    self.states[idx].current = None;
                    self.states[idx].exhausted = Some(reason.clone());
                    self.audits[idx].push(BallotOutcome::Exhausted {
                        reason: reason.clone(),
                        value,
                    });
                    self.observer.on_event(&TabulationEvent::BallotExhausted {
                        round,
                        ballot: idx,
                        reason,
                    });
                }
            }
        }

        if by_precinct {
            for (precinct, round_tally) in precinct_round.into_iter().enumerate() {
                self.precinct_tallies[precinct].push(round_tally);
            }
        }
        Ok(tally)
    }

    fn exhaust_reason(&self, kind: ExhaustKind) -> ExhaustReason {
        match kind {
            ExhaustKind::Undervote => ExhaustReason::Undervote,
            ExhaustKind::Overvote => ExhaustReason::Overvote,
            ExhaustKind::Duplicate(candidate) => {
                ExhaustReason::DuplicateCandidate(self.roster.name(candidate).to_string())
            }
            ExhaustKind::NoContinuingCandidates => ExhaustReason::NoContinuingCandidates,
        }
    }

    fn identify_winners(
        &mut self,
        tally: &Tally,
        by_tally: &BTreeMap<Decimal, Vec<CandidateId>>,
    ) -> Result<Vec<CandidateId>, TabulationError> {
        let seats = self.config.number_of_winners;
        let declared = self.winner_rounds.len() as u32;
        let mut selected: Vec<CandidateId> = Vec::new();

        if self.config.winner_election_mode == WinnerElectionMode::MultiSeatBottomsUpThreshold {
            for (votes, candidates) in by_tally {
                if *votes >= self.threshold {
                    selected.extend(candidates.iter().copied());
                }
            }
        } else if declared < seats {
            if tally.len() as u32 == seats - declared {
                // As many continuing candidates as open seats: all of them
                // win, whatever their tallies.
                selected.extend(tally.keys().copied());
            } else {
                match self.config.winner_election_mode {
                    WinnerElectionMode::MultiSeatBottomsUpUntilN => {}
                    WinnerElectionMode::MultiSeatAllowOnlyOnePerRound => {
                        if let Some((votes, candidates)) = by_tally.iter().next_back() {
                            if *votes >= self.threshold {
                                if candidates.len() > 1 {
                                    selected.push(self.break_tie(candidates, *votes, true)?);
                                } else {
                                    selected.push(candidates[0]);
                                }
                            }
                        }
                    }
                    _ => {
                        for (votes, candidates) in by_tally {
                            if *votes >= self.threshold {
                                selected.extend(candidates.iter().copied());
                            }
                        }
                    }
                }
            }
        }

        // Undeclared write-ins can hold votes but never a seat.
        if let Some(undeclared) = self.roster.undeclared {
            selected.retain(|c| *c != undeclared);
        }
        Ok(selected)
    }

    /// Reduces every ballot held by a new winner to its surplus fraction,
    /// remembering the share the winner keeps. The ballots re-route on the
    /// next round's tally pass.
    fn transfer_surplus(&mut self, tally: &Tally, winners: &[CandidateId]) {
        let round = self.current_round;
        for &winner in winners {
            let candidate_votes = tally.get(&winner).copied().unwrap_or(Decimal::ZERO);
            let extra = candidate_votes - self.threshold;
            let surplus_fraction = if extra > Decimal::ZERO {
                self.arith.div(extra, candidate_votes)
            } else {
                Decimal::ZERO
            };
            let event = TabulationEvent::SurplusTransferScheduled {
                round,
                winner: self.roster.name(winner).to_string(),
                surplus_fraction,
            };
            self.observer.on_event(&event);
            for state in &mut self.states {
                if state.current == Some(winner) {
                    let transferred = self.arith.mul(state.value, surplus_fraction);
                    state.winner_shares.insert(winner, state.value - transferred);
                    state.value = transferred;
                }
            }
        }
    }

    /// Fills in plateau tallies for past winners. Winners from the round
    /// before this one are re-derived from the shares on every ballot; any
    /// excess over the threshold is truncation residue and moves to the
    /// round's residual surplus.
    fn update_past_winner_tallies(&mut self) -> Result<(), TabulationError> {
        let round = self.current_round;
        let current = (round - 1) as usize;
        let by_precinct = self.config.tabulate_by_precinct;

        let mut to_process: Vec<CandidateId> = Vec::new();
        let mut requiring: Vec<CandidateId> = Vec::new();
        for &(winner, winning_round) in &self.winner_rounds {
            if winning_round == round {
                continue;
            }
            to_process.push(winner);
            if winning_round + 1 == round {
                requiring.push(winner);
            }
        }

        for &winner in &to_process {
            let value = if requiring.contains(&winner) {
                Decimal::ZERO
            } else {
                self.round_tallies[current - 1]
                    .get(&winner)
                    .copied()
                    .unwrap_or(Decimal::ZERO)
            };
            self.round_tallies[current].insert(winner, value);
            if by_precinct {
                for precinct in 0..self.precinct_names.len() {
                    let value = if requiring.contains(&winner) {
                        Decimal::ZERO
                    } else {
                        self.precinct_tallies[precinct][current - 1]
                            .get(&winner)
                            .copied()
                            .unwrap_or(Decimal::ZERO)
                    };
                    self.precinct_tallies[precinct][current].insert(winner, value);
                }
            }
        }

        if requiring.is_empty() {
            return Ok(());
        }
        for idx in 0..self.states.len() {
            let precinct = self.ballots[idx].precinct;
            for &winner in &requiring {
                let Some(share) = self.states[idx].winner_shares.get(&winner).copied() else {
                    continue;
                };
                increment(&mut self.round_tallies[current], winner, share);
                if by_precinct {
                    if let Some(p) = precinct {
                        increment(&mut self.precinct_tallies[p as usize][current], winner, share);
                    }
                }
            }
        }
        for &winner in &requiring {
            let winner_tally = self.round_tallies[current]
                .get(&winner)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let residual = winner_tally - self.threshold;
            if residual > Decimal::ZERO {
                self.residuals[current] += residual;
                self.round_tallies[current].insert(winner, self.threshold);
                let event = TabulationEvent::ResidualSurplusRecorded {
                    round,
                    winner: self.roster.name(winner).to_string(),
                    amount: residual,
                };
                self.observer.on_event(&event);
            } else if residual < Decimal::ZERO {
                return Err(TabulationError::InternalInvariantViolation(format!(
                    "winner \"{}\" holds {} votes, below the winning threshold, after surplus \
                     accounting",
                    self.roster.name(winner),
                    winner_tally
                )));
            }
        }
        Ok(())
    }

    /// The four mutually exclusive ways to pick this round's losers, in
    /// fixed order: undeclared write-ins, minimum-threshold drops, batch
    /// elimination, then the single lowest tally.
    fn select_eliminations(
        &mut self,
        tally: &Tally,
        by_tally: &BTreeMap<Decimal, Vec<CandidateId>>,
    ) -> Result<Vec<CandidateId>, TabulationError> {
        let round = self.current_round;

        if round == 1 {
            if let Some(undeclared) = self.roster.undeclared {
                let votes = tally.get(&undeclared).copied().unwrap_or(Decimal::ZERO);
                if votes > Decimal::ZERO {
                    let event = TabulationEvent::CandidateEliminated {
                        round,
                        candidate: self.roster.name(undeclared).to_string(),
                        votes,
                        kind: EliminationKind::UndeclaredWriteIns,
                    };
                    self.observer.on_event(&event);
                    return Ok(vec![undeclared]);
                }
            }
        }

        if let Some(minimum) = self.config.minimum_vote_threshold {
            if minimum > Decimal::ZERO {
                let below: Vec<(CandidateId, Decimal)> = by_tally
                    .iter()
                    .take_while(|(votes, _)| **votes < minimum)
                    .flat_map(|(votes, candidates)| {
                        candidates.iter().map(move |c| (*c, *votes))
                    })
                    .collect();
                if !below.is_empty() {
                    for (candidate, votes) in &below {
                        let event = TabulationEvent::CandidateEliminated {
                            round,
                            candidate: self.roster.name(*candidate).to_string(),
                            votes: *votes,
                            kind: EliminationKind::BelowMinimumThreshold,
                        };
                        self.observer.on_event(&event);
                    }
                    return Ok(below.into_iter().map(|(c, _)| c).collect());
                }
            }
        }

        if self.config.batch_elimination {
            let batch = run_batch_elimination(by_tally, &self.arith);
            if !batch.is_empty() {
                for elimination in &batch {
                    let event = TabulationEvent::CandidateEliminated {
                        round,
                        candidate: self.roster.name(elimination.candidate).to_string(),
                        votes: tally
                            .get(&elimination.candidate)
                            .copied()
                            .unwrap_or(Decimal::ZERO),
                        kind: EliminationKind::Batch {
                            running_total: elimination.running_total,
                            next_highest: elimination.next_highest_tally,
                        },
                    };
                    self.observer.on_event(&event);
                }
                return Ok(batch.into_iter().map(|e| e.candidate).collect());
            }
        }

        let Some((votes, candidates)) = by_tally.iter().next() else {
            return Err(TabulationError::InternalInvariantViolation(
                "no continuing candidates left to eliminate".to_string(),
            ));
        };
        let loser = if candidates.len() > 1 {
            self.break_tie(candidates, *votes, false)?
        } else {
            candidates[0]
        };
        let event = TabulationEvent::CandidateEliminated {
            round,
            candidate: self.roster.name(loser).to_string(),
            votes: *votes,
            kind: EliminationKind::Lowest,
        };
        self.observer.on_event(&event);
        Ok(vec![loser])
    }

    fn break_tie(
        &mut self,
        tied: &[CandidateId],
        votes: Decimal,
        selecting_winner: bool,
    ) -> Result<CandidateId, TabulationError> {
        let ctx = TieContext {
            mode: self.config.tiebreak_mode,
            round: self.current_round,
            votes,
            round_tallies: &self.round_tallies,
            permutation: &self.permutation,
            names: self.roster.names(),
        };
        let outcome = tiebreak::select(tied, &ctx, &mut self.rng, &mut self.resolver, selecting_winner)?;
        let event = TabulationEvent::TieBreakResolved {
            round: self.current_round,
            tied: tied
                .iter()
                .map(|c| self.roster.name(*c).to_string())
                .collect(),
            selected: self.roster.name(outcome.selected).to_string(),
            selecting_winner,
            explanation: outcome.explanation,
        };
        self.observer.on_event(&event);
        Ok(outcome.selected)
    }

    fn into_result(self) -> TabulationResult {
        let Engine {
            config,
            roster,
            ballots,
            audits,
            current_round,
            round_tallies,
            precinct_names,
            precinct_tallies,
            winner_rounds,
            elimination_rounds,
            transfers,
            residuals,
            threshold,
            ..
        } = self;

        let mut rounds: Vec<RoundRecord> = Vec::with_capacity(current_round as usize);
        for round in 1..=current_round {
            let idx = (round - 1) as usize;
            rounds.push(RoundRecord {
                round,
                tally: round_tallies[idx]
                    .iter()
                    .map(|(c, votes)| (roster.name(*c).to_string(), *votes))
                    .collect(),
                elected: winner_rounds
                    .iter()
                    .filter(|(_, r)| *r == round)
                    .map(|(c, _)| roster.name(*c).to_string())
                    .collect(),
                eliminated: elimination_rounds
                    .iter()
                    .filter(|(_, r)| *r == round)
                    .map(|(c, _)| roster.name(*c).to_string())
                    .collect(),
                transfers: transfers.round_snapshot(round, &roster),
                residual_surplus: residuals[idx],
            });
        }

        let precinct_result = if config.tabulate_by_precinct {
            precinct_names
                .iter()
                .zip(precinct_tallies)
                .map(|(name, tallies)| {
                    let rounds: Vec<BTreeMap<String, Decimal>> = tallies
                        .iter()
                        .map(|tally| {
                            tally
                                .iter()
                                .map(|(c, votes)| (roster.name(*c).to_string(), *votes))
                                .collect()
                        })
                        .collect();
                    (name.clone(), rounds)
                })
                .collect()
        } else {
            BTreeMap::new()
        };

        TabulationResult {
            threshold,
            winners: winner_rounds
                .iter()
                .map(|(c, _)| roster.name(*c).to_string())
                .collect(),
            rounds,
            winning_rounds: winner_rounds
                .iter()
                .map(|(c, r)| (roster.name(*c).to_string(), *r))
                .collect(),
            elimination_rounds: elimination_rounds
                .iter()
                .map(|(c, r)| (roster.name(*c).to_string(), *r))
                .collect(),
            ballots: ballots
                .iter()
                .zip(audits)
                .map(|(ballot, rounds)| BallotAudit {
                    id: ballot.id.clone(),
                    rounds,
                })
                .collect(),
            precinct_tallies: precinct_result,
        }
    }
}

fn increment(tally: &mut Tally, candidate: CandidateId, value: Decimal) {
    *tally.entry(candidate).or_insert(Decimal::ZERO) += value;
}

/// Inverts a tally map into a sorted tally-to-candidates map; candidates at
/// the same tally stay in id (name) order.
fn invert_tally(tally: &Tally) -> BTreeMap<Decimal, Vec<CandidateId>> {
    let mut by_tally: BTreeMap<Decimal, Vec<CandidateId>> = BTreeMap::new();
    for (candidate, votes) in tally {
        by_tally.entry(*votes).or_default().push(*candidate);
    }
    by_tally
}
