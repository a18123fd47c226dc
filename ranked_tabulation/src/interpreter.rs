use std::collections::HashSet;

use crate::ballot::{BallotRanks, BallotState, CandidateId};
use crate::config::OvervoteRule;

/// What a non-exhausted ballot does in the round being tallied.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub(crate) enum Disposition {
    /// The current recipient is still continuing.
    Stay,
    Transfer(CandidateId),
    Exhaust(ExhaustKind),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub(crate) enum ExhaustKind {
    Undervote,
    Overvote,
    Duplicate(CandidateId),
    NoContinuingCandidates,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum OvervoteDecision {
    None,
    Exhaust,
    SkipToNextRank,
}

/// Candidate statuses and the interpretation rules, frozen for one round.
/// Statuses never change while a round is being tallied.
pub(crate) struct RoundView {
    /// Continuing-for-selection, indexed by candidate id.
    pub(crate) continuing: Vec<bool>,
    pub(crate) overvote_label: Option<CandidateId>,
    pub(crate) overvote_rule: OvervoteRule,
    pub(crate) exhaust_on_duplicate: bool,
    pub(crate) max_skipped_ranks: Option<u32>,
    pub(crate) max_rankings: u32,
}

impl RoundView {
    fn is_continuing(&self, candidate: CandidateId) -> bool {
        self.continuing[candidate.0 as usize]
    }
}

/// Walks one ballot's rankings from most preferred upward and decides where
/// its vote goes this round.
pub(crate) fn interpret(ballot: &BallotRanks, state: &BallotState, view: &RoundView) -> Disposition {
    if let Some(current) = state.current {
        if view.is_continuing(current) {
            return Disposition::Stay;
        }
    }
    if ballot.ranks.is_empty() {
        return Disposition::Exhaust(ExhaustKind::Undervote);
    }

    let last_rank = ballot.ranks[ballot.ranks.len() - 1].0;
    let mut last_rank_seen = 0u32;
    let mut seen: HashSet<CandidateId> = HashSet::new();

    for (rank, marks) in &ballot.ranks {
        if let Some(max_skipped) = view.max_skipped_ranks {
            if rank - last_rank_seen > max_skipped + 1 {
                return Disposition::Exhaust(ExhaustKind::Undervote);
            }
        }
        last_rank_seen = *rank;

        if view.exhaust_on_duplicate {
            for mark in marks {
                if !seen.insert(*mark) {
                    return Disposition::Exhaust(ExhaustKind::Duplicate(*mark));
                }
            }
        }

        match overvote_decision(marks, view) {
            OvervoteDecision::Exhaust => return Disposition::Exhaust(ExhaustKind::Overvote),
            OvervoteDecision::SkipToNextRank => {
                if *rank == last_rank {
                    return Disposition::Exhaust(ExhaustKind::NoContinuingCandidates);
                }
                continue;
            }
            OvervoteDecision::None => {}
        }

        // At most one mark here can be continuing; more would have been an
        // overvote.
        if let Some(mark) = marks.iter().find(|m| view.is_continuing(**m)) {
            return Disposition::Transfer(*mark);
        }

        if *rank == last_rank {
            if let Some(max_skipped) = view.max_skipped_ranks {
                if view.max_rankings.saturating_sub(*rank) > max_skipped {
                    return Disposition::Exhaust(ExhaustKind::Undervote);
                }
            }
            return Disposition::Exhaust(ExhaustKind::NoContinuingCandidates);
        }
    }
    Disposition::Exhaust(ExhaustKind::NoContinuingCandidates)
}

fn overvote_decision(marks: &[CandidateId], view: &RoundView) -> OvervoteDecision {
    let explicit = view
        .overvote_label
        .map_or(false, |label| marks.contains(&label));
    if explicit {
        // The config loader rejects the explicit label alongside other marks
        // or with the exhaust-if-multiple-continuing rule.
        debug_assert!(marks.len() == 1);
        return match view.overvote_rule {
            OvervoteRule::ExhaustImmediately => OvervoteDecision::Exhaust,
            _ => OvervoteDecision::SkipToNextRank,
        };
    }
    if marks.len() <= 1 {
        return OvervoteDecision::None;
    }
    match view.overvote_rule {
        OvervoteRule::ExhaustImmediately => OvervoteDecision::Exhaust,
        OvervoteRule::AlwaysSkipToNextRank => OvervoteDecision::SkipToNextRank,
        OvervoteRule::ExhaustIfMultipleContinuing => {
            let continuing = marks.iter().filter(|m| view.is_continuing(**m)).count();
            if continuing >= 2 {
                OvervoteDecision::Exhaust
            } else {
                OvervoteDecision::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: CandidateId = CandidateId(0);
    const B: CandidateId = CandidateId(1);
    const C: CandidateId = CandidateId(2);
    const OVERVOTE: CandidateId = CandidateId(3);

    fn view(rule: OvervoteRule) -> RoundView {
        RoundView {
            continuing: vec![true, true, true, false],
            overvote_label: Some(OVERVOTE),
            overvote_rule: rule,
            exhaust_on_duplicate: false,
            max_skipped_ranks: None,
            max_rankings: 3,
        }
    }

    fn ballot(ranks: Vec<(u32, Vec<CandidateId>)>) -> BallotRanks {
        BallotRanks {
            id: None,
            precinct: None,
            ranks,
        }
    }

    #[test]
    fn ballot_stays_with_a_continuing_recipient() {
        let mut state = BallotState::fresh();
        state.current = Some(B);
        let b = ballot(vec![(1, vec![A])]);
        let disposition = interpret(&b, &state, &view(OvervoteRule::ExhaustImmediately));
        assert_eq!(disposition, Disposition::Stay);
    }

    #[test]
    fn empty_rankings_exhaust_as_undervote() {
        let b = ballot(vec![]);
        let disposition = interpret(
            &b,
            &BallotState::fresh(),
            &view(OvervoteRule::ExhaustImmediately),
        );
        assert_eq!(disposition, Disposition::Exhaust(ExhaustKind::Undervote));
    }

    #[test]
    fn multiple_continuing_marks_exhaust_under_exhaust_if_multiple() {
        let b = ballot(vec![(1, vec![A, B])]);
        let disposition = interpret(
            &b,
            &BallotState::fresh(),
            &view(OvervoteRule::ExhaustIfMultipleContinuing),
        );
        assert_eq!(disposition, Disposition::Exhaust(ExhaustKind::Overvote));
    }

    #[test]
    fn single_continuing_mark_survives_exhaust_if_multiple() {
        let mut v = view(OvervoteRule::ExhaustIfMultipleContinuing);
        v.continuing[A.0 as usize] = false;
        let b = ballot(vec![(1, vec![A, B])]);
        let disposition = interpret(&b, &BallotState::fresh(), &v);
        assert_eq!(disposition, Disposition::Transfer(B));
    }

    #[test]
    fn overvote_skips_to_next_rank_when_configured() {
        let b = ballot(vec![(1, vec![A, B]), (2, vec![C])]);
        let disposition = interpret(
            &b,
            &BallotState::fresh(),
            &view(OvervoteRule::AlwaysSkipToNextRank),
        );
        assert_eq!(disposition, Disposition::Transfer(C));
    }

    #[test]
    fn explicit_overvote_label_exhausts_immediately() {
        let b = ballot(vec![(1, vec![OVERVOTE]), (2, vec![A])]);
        let disposition = interpret(
            &b,
            &BallotState::fresh(),
            &view(OvervoteRule::ExhaustImmediately),
        );
        assert_eq!(disposition, Disposition::Exhaust(ExhaustKind::Overvote));
    }

    #[test]
    fn skipped_rank_gap_within_tolerance_is_reachable() {
        let mut v = view(OvervoteRule::ExhaustImmediately);
        v.continuing[A.0 as usize] = false;
        v.max_skipped_ranks = Some(1);
        let b = ballot(vec![(1, vec![A]), (3, vec![B])]);
        assert_eq!(
            interpret(&b, &BallotState::fresh(), &v),
            Disposition::Transfer(B)
        );
    }

    #[test]
    fn skipped_rank_gap_beyond_tolerance_exhausts() {
        let mut v = view(OvervoteRule::ExhaustImmediately);
        v.continuing[A.0 as usize] = false;
        v.max_skipped_ranks = Some(1);
        v.max_rankings = 4;
        let b = ballot(vec![(1, vec![A]), (4, vec![B])]);
        assert_eq!(
            interpret(&b, &BallotState::fresh(), &v),
            Disposition::Exhaust(ExhaustKind::Undervote)
        );
    }

    #[test]
    fn trailing_skipped_ranks_exhaust_as_undervote() {
        let mut v = view(OvervoteRule::ExhaustImmediately);
        v.continuing[A.0 as usize] = false;
        v.max_skipped_ranks = Some(0);
        v.max_rankings = 3;
        let b = ballot(vec![(1, vec![A])]);
        assert_eq!(
            interpret(&b, &BallotState::fresh(), &v),
            Disposition::Exhaust(ExhaustKind::Undervote)
        );
    }

    #[test]
    fn duplicate_candidate_exhausts_when_enabled() {
        let mut v = view(OvervoteRule::ExhaustImmediately);
        v.continuing[A.0 as usize] = false;
        v.exhaust_on_duplicate = true;
        let b = ballot(vec![(1, vec![A]), (2, vec![A]), (3, vec![B])]);
        assert_eq!(
            interpret(&b, &BallotState::fresh(), &v),
            Disposition::Exhaust(ExhaustKind::Duplicate(A))
        );
    }

    #[test]
    fn duplicate_candidate_is_skipped_when_disabled() {
        let mut v = view(OvervoteRule::ExhaustImmediately);
        v.continuing[A.0 as usize] = false;
        let b = ballot(vec![(1, vec![A]), (2, vec![A]), (3, vec![B])]);
        assert_eq!(
            interpret(&b, &BallotState::fresh(), &v),
            Disposition::Transfer(B)
        );
    }

    #[test]
    fn no_continuing_marks_exhausts_at_the_last_rank() {
        let mut v = view(OvervoteRule::ExhaustImmediately);
        v.continuing[A.0 as usize] = false;
        v.continuing[B.0 as usize] = false;
        let b = ballot(vec![(1, vec![A]), (2, vec![B])]);
        assert_eq!(
            interpret(&b, &BallotState::fresh(), &v),
            Disposition::Exhaust(ExhaustKind::NoContinuingCandidates)
        );
    }
}
