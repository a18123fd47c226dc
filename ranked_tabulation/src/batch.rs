use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::ballot::CandidateId;
use crate::decimal::VoteArith;

/// One batch-eliminated candidate with the context proving the elimination
/// was safe.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) struct BatchElimination {
    pub(crate) candidate: CandidateId,
    /// Sum of every tally at or below this candidate's.
    pub(crate) running_total: Decimal,
    /// The count the accumulated group could not reach.
    pub(crate) next_highest_tally: Decimal,
}

/// Accumulates tallies from the bottom up and eliminates every group that
/// cannot collectively reach the next count above it: even absorbing all
/// lower votes, none of them could overtake it.
///
/// A batch of one degenerates to the regular elimination path, which narrates
/// the tie-break uniformly, so it returns empty. Accumulation continues past
/// a successful batch because later groups may justify further eliminations
/// in the same round.
pub(crate) fn run_batch_elimination(
    tally_to_candidates: &BTreeMap<Decimal, Vec<CandidateId>>,
    arith: &VoteArith,
) -> Vec<BatchElimination> {
    let mut running_total = Decimal::ZERO;
    let mut seen: Vec<CandidateId> = Vec::new();
    let mut eliminations: Vec<BatchElimination> = Vec::new();

    for (votes, candidates) in tally_to_candidates {
        if running_total < *votes {
            // Everyone accumulated so far is mathematically out.
            let start = eliminations.len();
            for candidate in &seen[start..] {
                eliminations.push(BatchElimination {
                    candidate: *candidate,
                    running_total,
                    next_highest_tally: *votes,
                });
            }
        }
        let group_total = arith.mul(*votes, Decimal::from(candidates.len() as u64));
        running_total += group_total;
        seen.extend(candidates.iter().copied());
    }

    if eliminations.len() > 1 {
        eliminations
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const A: CandidateId = CandidateId(0);
    const B: CandidateId = CandidateId(1);
    const C: CandidateId = CandidateId(2);
    const D: CandidateId = CandidateId(3);

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn by_tally(entries: &[(&str, &[CandidateId])]) -> BTreeMap<Decimal, Vec<CandidateId>> {
        entries
            .iter()
            .map(|(votes, candidates)| (d(votes), candidates.to_vec()))
            .collect()
    }

    #[test]
    fn trailing_candidates_fall_in_one_batch() {
        let tallies = by_tally(&[("100", &[A]), ("1", &[B]), ("2", &[C]), ("3", &[D])]);
        let eliminations = run_batch_elimination(&tallies, &VoteArith::new(4));
        assert_eq!(
            eliminations,
            vec![
                BatchElimination {
                    candidate: B,
                    running_total: d("1"),
                    next_highest_tally: d("2"),
                },
                BatchElimination {
                    candidate: C,
                    running_total: d("6"),
                    next_highest_tally: d("100"),
                },
                BatchElimination {
                    candidate: D,
                    running_total: d("6"),
                    next_highest_tally: d("100"),
                },
            ]
        );
    }

    #[test]
    fn a_batch_of_one_returns_empty() {
        // B alone cannot reach A, but a single elimination goes through the
        // regular path.
        let tallies = by_tally(&[("10", &[A]), ("4", &[B])]);
        assert!(run_batch_elimination(&tallies, &VoteArith::new(4)).is_empty());
    }

    #[test]
    fn accumulated_votes_can_protect_a_candidate() {
        // C and D fall, but 2 + 2 + 5 >= 8 keeps B in the race.
        let tallies = by_tally(&[("8", &[A]), ("5", &[B]), ("2", &[C, D])]);
        let eliminations = run_batch_elimination(&tallies, &VoteArith::new(4));
        let candidates: Vec<CandidateId> = eliminations.iter().map(|e| e.candidate).collect();
        assert_eq!(candidates, vec![C, D]);
        assert_eq!(eliminations[0].running_total, d("4"));
        assert_eq!(eliminations[0].next_highest_tally, d("5"));
    }
}
