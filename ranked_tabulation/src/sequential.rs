use crate::ballot::{Ballot, Candidate};
use crate::config::{TabulationConfig, WinnerElectionMode};
use crate::results::{TabulationError, TabulationResult};
use crate::TabulationOptions;

/// Outcome of a sequential winner-takes-all contest: one full tabulation per
/// seat, with each pass excluding the winners of the passes before it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SequentialOutcome {
    /// Winners in the order their seats were filled.
    pub winners: Vec<String>,
    pub passes: Vec<TabulationResult>,
}

/// Runs a sequential winner-takes-all contest by re-running the engine once
/// per seat. The driver only sees each pass's winner; it never reaches inside
/// the engine, and every pass starts from fresh ballot state.
pub fn tabulate_sequential<'a>(
    candidates: &[Candidate],
    ballots: &[Ballot],
    config: &'a TabulationConfig,
    mut options: TabulationOptions<'a>,
) -> Result<SequentialOutcome, TabulationError> {
    if config.winner_election_mode != WinnerElectionMode::MultiSeatSequentialWinnerTakesAll {
        return Err(TabulationError::ConfigInvalid(
            "the sequential driver only runs sequential winner-takes-all contests".to_string(),
        ));
    }
    config.validate(candidates)?;

    let seats = config.number_of_winners;
    let mut pass_config = config.clone();
    pass_config.number_of_winners = 1;

    // The exclusions below are pass-local; the caller's candidate list is
    // untouched.
    let mut roster: Vec<Candidate> = candidates.to_vec();
    let mut winners: Vec<String> = Vec::new();
    let mut passes: Vec<TabulationResult> = Vec::new();

    while (winners.len() as u32) < seats {
        let result = crate::run_single(&roster, ballots, &pass_config, options.reborrow())?;
        if result.winners.len() != 1 {
            return Err(TabulationError::InternalInvariantViolation(format!(
                "a sequential pass produced {} winners instead of one",
                result.winners.len()
            )));
        }
        let winner = result.winners[0].clone();
        for candidate in roster.iter_mut() {
            if candidate.name == winner {
                candidate.excluded = true;
            }
        }
        winners.push(winner);
        passes.push(result);
    }

    Ok(SequentialOutcome { winners, passes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabulate;

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("Alpha"),
            Candidate::new("Bravo"),
            Candidate::new("Charlie"),
        ]
    }

    fn ballots() -> Vec<Ballot> {
        let mut ballots = Vec::new();
        for _ in 0..5 {
            ballots.push(Ballot::ranked(&["Alpha", "Bravo"]));
        }
        for _ in 0..4 {
            ballots.push(Ballot::ranked(&["Bravo"]));
        }
        for _ in 0..2 {
            ballots.push(Ballot::ranked(&["Charlie", "Bravo"]));
        }
        ballots
    }

    fn sequential_config(seats: u32) -> TabulationConfig {
        let mut config = TabulationConfig::default();
        config.winner_election_mode = WinnerElectionMode::MultiSeatSequentialWinnerTakesAll;
        config.number_of_winners = seats;
        config
    }

    #[test]
    fn each_pass_excludes_the_previous_winners() {
        let outcome = tabulate_sequential(
            &candidates(),
            &ballots(),
            &sequential_config(2),
            TabulationOptions::default(),
        )
        .unwrap();

        // Pass 1: Bravo wins after Charlie's elimination (5 + 4 + 2 = 11,
        // threshold 6, Bravo ends at 6). Pass 2 runs without Bravo.
        assert_eq!(outcome.winners, vec!["Bravo".to_string(), "Alpha".to_string()]);
        assert_eq!(outcome.passes.len(), 2);
        let second_pass = &outcome.passes[1];
        for round in &second_pass.rounds {
            assert!(!round.tally.contains_key("Bravo"));
        }
    }

    #[test]
    fn the_caller_candidate_list_is_untouched() {
        let roster = candidates();
        tabulate_sequential(
            &roster,
            &ballots(),
            &sequential_config(2),
            TabulationOptions::default(),
        )
        .unwrap();
        assert!(roster.iter().all(|c| !c.excluded));
    }

    #[test]
    fn the_plain_entry_point_refuses_sequential_contests() {
        let err = tabulate(&candidates(), &ballots(), &sequential_config(2)).unwrap_err();
        assert!(matches!(err, TabulationError::ConfigInvalid(_)));
    }
}
