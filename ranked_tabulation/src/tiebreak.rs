use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;

use crate::ballot::CandidateId;
use crate::config::TieBreakMode;
use crate::results::TabulationError;

/// A tie the engine cannot break on its own, handed to the embedding
/// application for resolution.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TieBreakRequest {
    pub round: u32,
    /// Tied candidates, in name order.
    pub candidates: Vec<String>,
    /// The tally every tied candidate holds.
    pub votes: Decimal,
    /// True when picking a winner, false when picking a loser.
    pub selecting_winner: bool,
}

/// Collaborator resolving interactive tie-breaks. The engine suspends on a
/// request and resumes with the returned choice; `None` aborts the
/// tabulation with `TieBreakInputRequired`.
pub trait TieResolver {
    fn resolve(&mut self, request: &TieBreakRequest) -> Option<String>;
}

/// Everything a tie-break can consult, borrowed from the engine for the
/// duration of one resolution.
pub(crate) struct TieContext<'a> {
    pub(crate) mode: TieBreakMode,
    pub(crate) round: u32,
    pub(crate) votes: Decimal,
    /// Completed round tallies, index `r - 1` for round `r`.
    pub(crate) round_tallies: &'a [BTreeMap<CandidateId, Decimal>],
    pub(crate) permutation: &'a [CandidateId],
    pub(crate) names: &'a [String],
}

#[derive(Debug)]
pub(crate) struct TieBreakOutcome {
    pub(crate) selected: CandidateId,
    pub(crate) explanation: String,
}

/// Deterministically selects one candidate from `tied` (already sorted by
/// id). `selecting_winner` flips every rule to its symmetric form.
pub(crate) fn select(
    tied: &[CandidateId],
    ctx: &TieContext<'_>,
    rng: &mut Option<StdRng>,
    resolver: &mut Option<&mut dyn TieResolver>,
    selecting_winner: bool,
) -> Result<TieBreakOutcome, TabulationError> {
    match ctx.mode {
        TieBreakMode::Random => random_choice(tied, rng),
        TieBreakMode::Interactive => interactive_choice(tied, ctx, resolver, selecting_winner),
        TieBreakMode::PreviousRoundCountsThenRandom => {
            match previous_round_choice(tied, ctx, selecting_winner) {
                Some(outcome) => Ok(outcome),
                None => random_choice(tied, rng),
            }
        }
        TieBreakMode::PreviousRoundCountsThenInteractive => {
            match previous_round_choice(tied, ctx, selecting_winner) {
                Some(outcome) => Ok(outcome),
                None => interactive_choice(tied, ctx, resolver, selecting_winner),
            }
        }
        TieBreakMode::UsePermutationInConfig | TieBreakMode::GeneratePermutation => {
            permutation_choice(tied, ctx, selecting_winner)
        }
    }
}

fn random_choice(
    tied: &[CandidateId],
    rng: &mut Option<StdRng>,
) -> Result<TieBreakOutcome, TabulationError> {
    let rng = rng.as_mut().ok_or_else(|| {
        TabulationError::InternalInvariantViolation(
            "random tie-break reached without a seeded generator".to_string(),
        )
    })?;
    let selected = tied[rng.gen_range(0..tied.len())];
    Ok(TieBreakOutcome {
        selected,
        explanation: format!(
            "chosen by the seeded random generator among {} tied candidates",
            tied.len()
        ),
    })
}

fn interactive_choice(
    tied: &[CandidateId],
    ctx: &TieContext<'_>,
    resolver: &mut Option<&mut dyn TieResolver>,
    selecting_winner: bool,
) -> Result<TieBreakOutcome, TabulationError> {
    let candidates: Vec<String> = tied
        .iter()
        .map(|c| ctx.names[c.0 as usize].clone())
        .collect();
    let unresolved = TabulationError::TieBreakInputRequired {
        round: ctx.round,
        candidates: candidates.clone(),
    };
    let Some(resolver) = resolver.as_mut() else {
        return Err(unresolved);
    };
    let request = TieBreakRequest {
        round: ctx.round,
        candidates: candidates.clone(),
        votes: ctx.votes,
        selecting_winner,
    };
    match resolver.resolve(&request) {
        Some(choice) => match tied.iter().find(|c| ctx.names[c.0 as usize] == choice) {
            Some(selected) => Ok(TieBreakOutcome {
                selected: *selected,
                explanation: "resolved interactively".to_string(),
            }),
            None => Err(unresolved),
        },
        None => Err(unresolved),
    }
}

/// Walks back through earlier rounds, narrowing the tied set to whichever
/// group is extreme (lowest for losers, highest for winners). Returns `None`
/// when the candidates were never separated.
fn previous_round_choice(
    tied: &[CandidateId],
    ctx: &TieContext<'_>,
    selecting_winner: bool,
) -> Option<TieBreakOutcome> {
    let mut pool: Vec<CandidateId> = tied.to_vec();
    for round in (1..ctx.round).rev() {
        let tallies = ctx.round_tallies.get((round - 1) as usize)?;
        let mut by_tally: BTreeMap<Decimal, Vec<CandidateId>> = BTreeMap::new();
        for candidate in &pool {
            let votes = tallies.get(candidate).copied().unwrap_or(Decimal::ZERO);
            by_tally.entry(votes).or_default().push(*candidate);
        }
        if by_tally.len() == 1 {
            continue;
        }
        let (votes, group) = if selecting_winner {
            by_tally.iter().next_back()?
        } else {
            by_tally.iter().next()?
        };
        if group.len() == 1 {
            return Some(TieBreakOutcome {
                selected: group[0],
                explanation: format!(
                    "had the {} count ({} votes) in round {}",
                    if selecting_winner { "highest" } else { "lowest" },
                    votes,
                    round
                ),
            });
        }
        pool = group.clone();
    }
    None
}

fn permutation_choice(
    tied: &[CandidateId],
    ctx: &TieContext<'_>,
    selecting_winner: bool,
) -> Result<TieBreakOutcome, TabulationError> {
    let mut best: Option<(usize, CandidateId)> = None;
    for candidate in tied {
        let position = ctx
            .permutation
            .iter()
            .position(|p| p == candidate)
            .ok_or_else(|| {
                TabulationError::InternalInvariantViolation(format!(
                    "candidate \"{}\" is missing from the tie-break permutation",
                    ctx.names[candidate.0 as usize]
                ))
            })?;
        let better = match best {
            None => true,
            // Winners come from the front of the permutation, losers from
            // the back.
            Some((current, _)) => {
                if selecting_winner {
                    position < current
                } else {
                    position > current
                }
            }
        };
        if better {
            best = Some((position, *candidate));
        }
    }
    let (position, selected) = best.ok_or_else(|| {
        TabulationError::InternalInvariantViolation("tie-break over an empty set".to_string())
    })?;
    Ok(TieBreakOutcome {
        selected,
        explanation: format!("held position {} in the tie-break permutation", position + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::str::FromStr;

    const X: CandidateId = CandidateId(0);
    const Y: CandidateId = CandidateId(1);

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn names() -> Vec<String> {
        vec!["Xylia".to_string(), "York".to_string()]
    }

    fn tallies(rounds: &[&[(CandidateId, &str)]]) -> Vec<BTreeMap<CandidateId, Decimal>> {
        rounds
            .iter()
            .map(|round| round.iter().map(|(c, v)| (*c, d(v))).collect())
            .collect()
    }

    #[test]
    fn previous_round_counts_separate_the_tie() {
        // Tied at 10 in round 3; round 2 had them at 9 and 11.
        let round_tallies = tallies(&[
            &[(X, "8"), (Y, "8")],
            &[(X, "9"), (Y, "11")],
        ]);
        let names = names();
        let ctx = TieContext {
            mode: TieBreakMode::PreviousRoundCountsThenRandom,
            round: 3,
            votes: d("10"),
            round_tallies: &round_tallies,
            permutation: &[],
            names: &names,
        };
        // No generator is supplied: reaching the random fallback would error.
        let outcome = select(&[X, Y], &ctx, &mut None, &mut None, false).unwrap();
        assert_eq!(outcome.selected, X);
        let winner = select(&[X, Y], &ctx, &mut None, &mut None, true).unwrap();
        assert_eq!(winner.selected, Y);
    }

    #[test]
    fn previous_round_counts_fall_through_to_random() {
        let round_tallies = tallies(&[&[(X, "5"), (Y, "5")]]);
        let names = names();
        let ctx = TieContext {
            mode: TieBreakMode::PreviousRoundCountsThenRandom,
            round: 2,
            votes: d("7"),
            round_tallies: &round_tallies,
            permutation: &[],
            names: &names,
        };
        let mut first_rng = Some(StdRng::seed_from_u64(91));
        let first = select(&[X, Y], &ctx, &mut first_rng, &mut None, false).unwrap();
        let mut second_rng = Some(StdRng::seed_from_u64(91));
        let second = select(&[X, Y], &ctx, &mut second_rng, &mut None, false).unwrap();
        assert_eq!(first.selected, second.selected);
    }

    #[test]
    fn permutation_picks_last_for_losers_and_first_for_winners() {
        let names = names();
        let permutation = vec![Y, X];
        let ctx = TieContext {
            mode: TieBreakMode::UsePermutationInConfig,
            round: 1,
            votes: d("3"),
            round_tallies: &[],
            permutation: &permutation,
            names: &names,
        };
        let loser = select(&[X, Y], &ctx, &mut None, &mut None, false).unwrap();
        assert_eq!(loser.selected, X);
        let winner = select(&[X, Y], &ctx, &mut None, &mut None, true).unwrap();
        assert_eq!(winner.selected, Y);
    }

    #[test]
    fn interactive_without_resolver_surfaces_the_request() {
        let names = names();
        let ctx = TieContext {
            mode: TieBreakMode::Interactive,
            round: 4,
            votes: d("2"),
            round_tallies: &[],
            permutation: &[],
            names: &names,
        };
        let err = select(&[X, Y], &ctx, &mut None, &mut None, false).unwrap_err();
        assert_eq!(
            err,
            TabulationError::TieBreakInputRequired {
                round: 4,
                candidates: vec!["Xylia".to_string(), "York".to_string()],
            }
        );
    }

    #[test]
    fn interactive_resolution_is_validated_against_the_tied_set() {
        struct Fixed(&'static str);
        impl TieResolver for Fixed {
            fn resolve(&mut self, _request: &TieBreakRequest) -> Option<String> {
                Some(self.0.to_string())
            }
        }
        let names = names();
        let ctx = TieContext {
            mode: TieBreakMode::Interactive,
            round: 1,
            votes: d("2"),
            round_tallies: &[],
            permutation: &[],
            names: &names,
        };
        let mut good = Fixed("York");
        let mut resolver: Option<&mut dyn TieResolver> = Some(&mut good);
        let outcome = select(&[X, Y], &ctx, &mut None, &mut resolver, false).unwrap();
        assert_eq!(outcome.selected, Y);

        let mut bad = Fixed("Zelda");
        let mut resolver: Option<&mut dyn TieResolver> = Some(&mut bad);
        assert!(select(&[X, Y], &ctx, &mut None, &mut resolver, false).is_err());
    }
}
