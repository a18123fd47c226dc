use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rust_decimal::Decimal;

use crate::ballot::Candidate;
use crate::results::TabulationError;

// The configuration options follow the rules defined here:
// https://github.com/BrightSpots/rcv/blob/develop/config_file_documentation.txt
// The string labels used in configuration files are owned by the config
// loader; the engine only ever sees these variants.

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum WinnerElectionMode {
    SingleWinner,
    MultiSeatAllowOnlyOnePerRound,
    MultiSeatAllowMultiplePerRound,
    MultiSeatBottomsUpUntilN,
    MultiSeatBottomsUpThreshold,
    MultiSeatSequentialWinnerTakesAll,
}

impl WinnerElectionMode {
    /// Bottoms-up contests never transfer surplus votes.
    pub(crate) fn is_bottoms_up(&self) -> bool {
        matches!(
            self,
            WinnerElectionMode::MultiSeatBottomsUpUntilN
                | WinnerElectionMode::MultiSeatBottomsUpThreshold
        )
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum OvervoteRule {
    ExhaustImmediately,
    AlwaysSkipToNextRank,
    ExhaustIfMultipleContinuing,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    Random,
    Interactive,
    PreviousRoundCountsThenRandom,
    PreviousRoundCountsThenInteractive,
    UsePermutationInConfig,
    GeneratePermutation,
}

impl TieBreakMode {
    pub(crate) fn needs_seed(&self) -> bool {
        matches!(
            self,
            TieBreakMode::Random
                | TieBreakMode::PreviousRoundCountsThenRandom
                | TieBreakMode::GeneratePermutation
        )
    }
}

/// All the rules for one contest. The engine treats this as read-only.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TabulationConfig {
    pub number_of_winners: u32,
    pub winner_election_mode: WinnerElectionMode,
    /// Fraction of the first-round votes a candidate must hold to win, in
    /// `(0, 1]`. Required iff the mode is bottoms-up with threshold.
    pub bottoms_up_percentage_threshold: Option<Decimal>,
    pub overvote_rule: OvervoteRule,
    pub tiebreak_mode: TieBreakMode,
    pub random_seed: Option<u64>,
    /// Candidate order for the permutation tie-break modes; the loader fills
    /// it with the config-file candidate order. Empty means lexicographic
    /// name order. For `GeneratePermutation` the engine derives the order
    /// from the seed instead.
    pub candidate_permutation: Vec<String>,
    /// `None` means as many rankings as there are declared candidates.
    pub max_rankings_allowed: Option<u32>,
    /// `None` means unlimited.
    pub max_skipped_ranks_allowed: Option<u32>,
    pub minimum_vote_threshold: Option<Decimal>,
    pub decimal_places: u8,
    pub batch_elimination: bool,
    pub continue_until_two_candidates_remain: bool,
    pub exhaust_on_duplicate_candidate: bool,
    pub non_integer_winning_threshold: bool,
    pub hare_quota: bool,
    pub tabulate_by_precinct: bool,
    /// The normalized label CVR readers use for an explicit overvote mark.
    pub explicit_overvote_label: String,
    /// When set, this label is tallied as a synthetic candidate and dropped
    /// in round 1.
    pub undeclared_write_in_label: Option<String>,
}

impl Default for TabulationConfig {
    fn default() -> TabulationConfig {
        TabulationConfig {
            number_of_winners: 1,
            winner_election_mode: WinnerElectionMode::SingleWinner,
            bottoms_up_percentage_threshold: None,
            overvote_rule: OvervoteRule::AlwaysSkipToNextRank,
            tiebreak_mode: TieBreakMode::UsePermutationInConfig,
            random_seed: None,
            candidate_permutation: Vec::new(),
            max_rankings_allowed: None,
            max_skipped_ranks_allowed: None,
            minimum_vote_threshold: None,
            decimal_places: 4,
            batch_elimination: false,
            continue_until_two_candidates_remain: false,
            exhaust_on_duplicate_candidate: false,
            non_integer_winning_threshold: false,
            hare_quota: false,
            tabulate_by_precinct: false,
            explicit_overvote_label: "overvote".to_string(),
            undeclared_write_in_label: None,
        }
    }
}

impl TabulationConfig {
    /// Checks everything that can be checked before the first round. The
    /// engine refuses to start on any failure here.
    pub fn validate(&self, candidates: &[Candidate]) -> Result<(), TabulationError> {
        let invalid = |msg: String| Err(TabulationError::ConfigInvalid(msg));

        if !(1..=20).contains(&self.decimal_places) {
            return invalid(format!(
                "decimal places must be between 1 and 20, got {}",
                self.decimal_places
            ));
        }
        if candidates.is_empty() {
            return invalid("at least one candidate is required".to_string());
        }
        let eligible = candidates.iter().filter(|c| !c.excluded).count() as u32;
        if eligible == 0 {
            return invalid("every candidate is excluded from tabulation".to_string());
        }

        let n = self.number_of_winners;
        match self.winner_election_mode {
            WinnerElectionMode::SingleWinner => {
                if n != 1 {
                    return invalid(format!(
                        "single-winner contests need exactly 1 seat, got {}",
                        n
                    ));
                }
            }
            WinnerElectionMode::MultiSeatAllowOnlyOnePerRound
            | WinnerElectionMode::MultiSeatAllowMultiplePerRound
            | WinnerElectionMode::MultiSeatBottomsUpUntilN => {
                if n < 2 {
                    return invalid(format!(
                        "multi-seat contests need at least 2 seats, got {}",
                        n
                    ));
                }
            }
            WinnerElectionMode::MultiSeatBottomsUpThreshold => {
                if n != 0 {
                    return invalid(
                        "bottoms-up threshold contests must configure 0 seats".to_string(),
                    );
                }
                match self.bottoms_up_percentage_threshold {
                    Some(pct) if pct > Decimal::ZERO && pct <= Decimal::ONE => {}
                    Some(pct) => {
                        return invalid(format!(
                            "the bottoms-up percentage threshold must be in (0, 1], got {}",
                            pct
                        ));
                    }
                    None => {
                        return invalid(
                            "bottoms-up threshold contests require a percentage threshold"
                                .to_string(),
                        );
                    }
                }
            }
            // The sequential driver overrides the seat count to 1 per pass.
            WinnerElectionMode::MultiSeatSequentialWinnerTakesAll => {
                if n < 1 {
                    return invalid("sequential contests need at least 1 seat".to_string());
                }
            }
        }
        if self.winner_election_mode != WinnerElectionMode::MultiSeatBottomsUpThreshold {
            if self.bottoms_up_percentage_threshold.is_some() {
                return invalid(
                    "a percentage threshold is only valid in bottoms-up threshold mode".to_string(),
                );
            }
            if n > eligible {
                return invalid(format!(
                    "{} seats cannot be filled by {} eligible candidates",
                    n, eligible
                ));
            }
        }

        if self.tiebreak_mode.needs_seed() && self.random_seed.is_none() {
            return invalid(
                "a random seed is required when the tie-break mode involves randomness".to_string(),
            );
        }
        if self.tiebreak_mode == TieBreakMode::UsePermutationInConfig
            && !self.candidate_permutation.is_empty()
        {
            for candidate in candidates.iter().filter(|c| !c.excluded) {
                if !self.candidate_permutation.contains(&candidate.name) {
                    return invalid(format!(
                        "candidate \"{}\" is missing from the tie-break permutation",
                        candidate.name
                    ));
                }
            }
        }

        if self.continue_until_two_candidates_remain
            && self.winner_election_mode != WinnerElectionMode::SingleWinner
        {
            return invalid(
                "continuing until two candidates remain only applies to single-winner contests"
                    .to_string(),
            );
        }

        if self.explicit_overvote_label.is_empty() {
            return invalid("the explicit overvote label cannot be empty".to_string());
        }
        if let Some(label) = &self.undeclared_write_in_label {
            if label.is_empty() {
                return invalid("the undeclared write-in label cannot be empty".to_string());
            }
            if *label == self.explicit_overvote_label {
                return invalid(
                    "the undeclared write-in label conflicts with the overvote label".to_string(),
                );
            }
        }

        Ok(())
    }
}

/// Shuffles the non-excluded candidates into the tie-break order used by the
/// `GeneratePermutation` mode. Pure function of the seed and candidate set.
pub fn generate_candidate_permutation(candidates: &[Candidate], seed: u64) -> Vec<String> {
    let mut names: Vec<String> = candidates
        .iter()
        .filter(|c| !c.excluded)
        .map(|c| c.name.clone())
        .collect();
    names.sort();
    let mut rng = StdRng::seed_from_u64(seed);
    names.shuffle(&mut rng);
    names
}
