use crate::rcv::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::{whatever, OptionExt};
use std::str::FromStr;

use ranked_tabulation::{
    Candidate, Decimal, OvervoteRule, TabulationConfig, TieBreakMode, WinnerElectionMode,
};

/// The internal name all undeclared write-in marks are normalized to.
pub const UNDECLARED_WRITE_IN_LABEL: &str = "Undeclared Write-ins";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_juridiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
    #[serde(rename = "tabulateByPrecinct")]
    pub tabulate_by_precinct: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
    pub threshold: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteColumnIndex")]
    _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "idColumnIndex")]
    pub id_column_index: Option<JSValue>,
    #[serde(rename = "precinctColumnIndex")]
    pub precinct_column_index: Option<JSValue>,
    #[serde(rename = "countColumnIndex")]
    pub count_column_index: Option<JSValue>,
    #[serde(rename = "overvoteDelimiter")]
    pub overvote_delimiter: Option<String>,
    #[serde(rename = "overvoteLabel")]
    pub overvote_label: Option<String>,
    #[serde(rename = "undervoteLabel")]
    pub undervote_label: Option<String>,
    #[serde(rename = "undeclaredWriteInLabel")]
    pub undeclared_write_in_label: Option<String>,
    #[serde(rename = "treatBlankAsUndeclaredWriteIn")]
    pub treat_blank_as_undeclared_write_in: Option<bool>,
}

impl FileSource {
    pub fn first_vote_column_index(&self) -> RcvResult<usize> {
        let idx = read_js_int(&self._first_vote_column_index)?;
        Ok(idx.saturating_sub(1))
    }

    pub fn first_vote_row_index(&self) -> RcvResult<usize> {
        match &self._first_vote_row_index {
            Some(_) => read_js_int(&self._first_vote_row_index),
            None => Ok(1),
        }
    }

    pub fn id_column_index_int(&self) -> RcvResult<Option<usize>> {
        match &self.id_column_index {
            Some(_) => read_js_int(&self.id_column_index).map(|idx| Some(idx.saturating_sub(1))),
            None => Ok(None),
        }
    }

    pub fn precinct_column_index_int(&self) -> RcvResult<Option<usize>> {
        match &self.precinct_column_index {
            Some(_) => {
                read_js_int(&self.precinct_column_index).map(|idx| Some(idx.saturating_sub(1)))
            }
            None => Ok(None),
        }
    }

    pub fn count_column_index_int(&self) -> RcvResult<Option<usize>> {
        match &self.count_column_index {
            Some(_) => read_js_int(&self.count_column_index).map(|idx| Some(idx.saturating_sub(1))),
            None => Ok(None),
        }
    }

    /// True when this source can introduce undeclared write-ins.
    pub fn maps_write_ins(&self) -> bool {
        self.undeclared_write_in_label.is_some()
            || self.treat_blank_as_undeclared_write_in.unwrap_or(false)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvCandidate {
    pub name: String,
    pub code: Option<String>,
    pub excluded: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvRules {
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: String,
    #[serde(rename = "overvoteRule")]
    pub overvote_rule: String,
    #[serde(rename = "winnerElectionMode")]
    pub winner_election_mode: String,
    #[serde(rename = "numberOfWinners")]
    pub number_of_winners: Option<JSValue>,
    #[serde(rename = "multiSeatBottomsUpPercentageThreshold")]
    pub multi_seat_bottoms_up_percentage_threshold: Option<JSValue>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
    #[serde(rename = "maxSkippedRanksAllowed")]
    pub max_skipped_ranks_allowed: String,
    #[serde(rename = "maxRankingsAllowed")]
    pub max_rankings_allowed: String,
    #[serde(rename = "minimumVoteThreshold")]
    pub minimum_vote_threshold: Option<JSValue>,
    #[serde(rename = "decimalPlacesForVoteArithmetic")]
    pub decimal_places_for_vote_arithmetic: Option<JSValue>,
    #[serde(rename = "rulesDescription")]
    pub rules_description: Option<String>,
    #[serde(rename = "batchElimination")]
    pub batch_elimination: Option<bool>,
    #[serde(rename = "continueUntilTwoCandidatesRemain")]
    pub continue_until_two_candidates_remain: Option<bool>,
    #[serde(rename = "exhaustOnDuplicateCandidate")]
    pub exhaust_on_duplicate_candidate: Option<bool>,
    #[serde(rename = "nonIntegerWinningThreshold")]
    pub non_integer_winning_threshold: Option<bool>,
    #[serde(rename = "hareQuota")]
    pub hare_quota: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "cvrFileSources")]
    pub cvr_file_sources: Vec<FileSource>,
    pub candidates: Vec<RcvCandidate>,
    pub rules: RcvRules,
}

/// Maps the JSON rules onto the engine's typed configuration, and the
/// candidate records onto the engine roster. Every string label is decoded
/// here; the engine never sees one.
pub fn validate_config(config: &RcvConfig) -> RcvResult<(TabulationConfig, Vec<Candidate>)> {
    let rules = &config.rules;
    let mut result = TabulationConfig::default();

    result.tiebreak_mode = match rules.tiebreak_mode.as_str() {
        "random" => TieBreakMode::Random,
        "interactive" | "stopCountingAndAsk" => TieBreakMode::Interactive,
        "previousRoundCountsThenRandom" => TieBreakMode::PreviousRoundCountsThenRandom,
        "previousRoundCountsThenInteractive" | "previousRoundCountsThenAsk" => {
            TieBreakMode::PreviousRoundCountsThenInteractive
        }
        "usePermutationInConfig" | "useCandidateOrder" => TieBreakMode::UsePermutationInConfig,
        "generatePermutation" => TieBreakMode::GeneratePermutation,
        other => whatever!("unknown tiebreak mode: {}", other),
    };

    result.overvote_rule = match rules.overvote_rule.as_str() {
        "exhaustImmediately" => OvervoteRule::ExhaustImmediately,
        "alwaysSkipToNextRank" => OvervoteRule::AlwaysSkipToNextRank,
        "exhaustIfMultipleContinuing" => OvervoteRule::ExhaustIfMultipleContinuing,
        other => whatever!("unknown overvote rule: {}", other),
    };

    result.winner_election_mode = match rules.winner_election_mode.as_str() {
        "singleWinnerMajority" => WinnerElectionMode::SingleWinner,
        "multiSeatAllowOnlyOneWinnerPerRound" | "multiWinnerAllowOnlyOneWinnerPerRound" => {
            WinnerElectionMode::MultiSeatAllowOnlyOnePerRound
        }
        "multiSeatAllowMultipleWinnersPerRound" | "multiWinnerAllowMultipleWinnersPerRound" => {
            WinnerElectionMode::MultiSeatAllowMultiplePerRound
        }
        "multiSeatBottomsUpUntilNWinners" => WinnerElectionMode::MultiSeatBottomsUpUntilN,
        "multiSeatBottomsUpUsingPercentageThreshold" => {
            WinnerElectionMode::MultiSeatBottomsUpThreshold
        }
        "multiSeatSequentialWinnerTakesAll" => {
            WinnerElectionMode::MultiSeatSequentialWinnerTakesAll
        }
        other => whatever!("unknown winner election mode: {}", other),
    };

    result.number_of_winners = match &rules.number_of_winners {
        Some(_) => read_js_int(&rules.number_of_winners)? as u32,
        None if result.winner_election_mode == WinnerElectionMode::MultiSeatBottomsUpThreshold => 0,
        None => 1,
    };

    result.bottoms_up_percentage_threshold =
        match &rules.multi_seat_bottoms_up_percentage_threshold {
            Some(value) => {
                // The file carries a percentage in (0, 100]; the engine works
                // with a fraction.
                let percentage = read_js_decimal(value)?;
                Some(percentage / Decimal::from(100))
            }
            None => None,
        };

    result.random_seed = match &rules.random_seed {
        Some(raw) => match raw.parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(_) => whatever!("randomSeed is not a non-negative integer: {}", raw),
        },
        None => None,
    };

    result.max_skipped_ranks_allowed = match rules.max_skipped_ranks_allowed.as_str() {
        "unlimited" => None,
        raw => match raw.parse::<u32>() {
            Ok(count) => Some(count),
            Err(_) => whatever!("failed to understand maxSkippedRanksAllowed option: {}", raw),
        },
    };

    result.max_rankings_allowed = match rules.max_rankings_allowed.as_str() {
        "max" => None,
        raw => match raw.parse::<u32>() {
            Ok(count) if count > 0 => Some(count),
            _ => whatever!("failed to understand maxRankingsAllowed option: {}", raw),
        },
    };

    result.minimum_vote_threshold = match &rules.minimum_vote_threshold {
        Some(value) => Some(read_js_decimal(value)?),
        None => None,
    };

    result.decimal_places = match &rules.decimal_places_for_vote_arithmetic {
        Some(_) => read_js_int(&rules.decimal_places_for_vote_arithmetic)? as u8,
        None => 4,
    };

    result.batch_elimination = rules.batch_elimination.unwrap_or(false);
    result.continue_until_two_candidates_remain =
        rules.continue_until_two_candidates_remain.unwrap_or(false);
    result.exhaust_on_duplicate_candidate = rules.exhaust_on_duplicate_candidate.unwrap_or(false);
    result.non_integer_winning_threshold = rules.non_integer_winning_threshold.unwrap_or(false);
    result.hare_quota = rules.hare_quota.unwrap_or(false);
    result.tabulate_by_precinct = config
        .output_settings
        .tabulate_by_precinct
        .unwrap_or(false);

    if config.cvr_file_sources.iter().any(|s| s.maps_write_ins()) {
        result.undeclared_write_in_label = Some(UNDECLARED_WRITE_IN_LABEL.to_string());
    }

    // The permutation tie-break uses the candidate order of the config file.
    result.candidate_permutation = config.candidates.iter().map(|c| c.name.clone()).collect();

    let candidates: Vec<Candidate> = config
        .candidates
        .iter()
        .map(|c| Candidate {
            name: c.name.clone(),
            code: match c.code.clone() {
                Some(code) if code.is_empty() => None,
                code => code,
            },
            excluded: c.excluded.unwrap_or(false),
        })
        .collect();

    if let Err(error) = result.validate(&candidates) {
        whatever!("configuration rejected: {}", error);
    }
    Ok((result, candidates))
}

pub fn read_js_int(value: &Option<JSValue>) -> RcvResult<usize> {
    match value {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        // Excel-style single-letter column names.
        Some(JSValue::String(s)) if s.chars().all(|c| c.is_alphabetic()) && s.chars().count() == 1 =>
        {
            let c1: char = s.to_lowercase().chars().next().unwrap();
            Ok((c1 as usize) - ('a' as usize) + 1)
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

fn read_js_decimal(value: &JSValue) -> RcvResult<Decimal> {
    let parsed = match value {
        JSValue::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        JSValue::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    };
    parsed.context(ParsingJsonNumberSnafu {})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config(rules: RcvRules) -> RcvConfig {
        RcvConfig {
            output_settings: OutputSettings {
                contest_name: "test contest".to_string(),
                output_directory: None,
                contest_date: None,
                contest_juridiction: None,
                contest_office: None,
                tabulate_by_precinct: None,
            },
            cvr_file_sources: vec![],
            candidates: vec![
                RcvCandidate {
                    name: "Alpha".to_string(),
                    code: Some("".to_string()),
                    excluded: None,
                },
                RcvCandidate {
                    name: "Bravo".to_string(),
                    code: None,
                    excluded: Some(false),
                },
            ],
            rules,
        }
    }

    fn default_rules() -> RcvRules {
        RcvRules {
            tiebreak_mode: "useCandidateOrder".to_string(),
            overvote_rule: "alwaysSkipToNextRank".to_string(),
            winner_election_mode: "singleWinnerMajority".to_string(),
            number_of_winners: Some(serde_json::json!("1")),
            multi_seat_bottoms_up_percentage_threshold: None,
            random_seed: None,
            max_skipped_ranks_allowed: "unlimited".to_string(),
            max_rankings_allowed: "max".to_string(),
            minimum_vote_threshold: None,
            decimal_places_for_vote_arithmetic: None,
            rules_description: None,
            batch_elimination: None,
            continue_until_two_candidates_remain: None,
            exhaust_on_duplicate_candidate: None,
            non_integer_winning_threshold: None,
            hare_quota: None,
        }
    }

    #[test]
    fn default_rules_map_to_a_single_winner_config() {
        let (config, candidates) = validate_config(&minimal_config(default_rules())).unwrap();
        assert_eq!(config.winner_election_mode, WinnerElectionMode::SingleWinner);
        assert_eq!(config.number_of_winners, 1);
        assert_eq!(config.tiebreak_mode, TieBreakMode::UsePermutationInConfig);
        assert_eq!(
            config.candidate_permutation,
            vec!["Alpha".to_string(), "Bravo".to_string()]
        );
        assert_eq!(config.decimal_places, 4);
        assert_eq!(candidates[0].code, None);
    }

    #[test]
    fn percentage_threshold_becomes_a_fraction() {
        let mut rules = default_rules();
        rules.winner_election_mode = "multiSeatBottomsUpUsingPercentageThreshold".to_string();
        rules.number_of_winners = Some(serde_json::json!("0"));
        rules.multi_seat_bottoms_up_percentage_threshold = Some(serde_json::json!("12.5"));
        let (config, _) = validate_config(&minimal_config(rules)).unwrap();
        assert_eq!(
            config.bottoms_up_percentage_threshold,
            Some(Decimal::from_str("0.125").unwrap())
        );
    }

    #[test]
    fn unknown_labels_are_rejected() {
        let mut rules = default_rules();
        rules.overvote_rule = "invalidOption".to_string();
        assert!(validate_config(&minimal_config(rules)).is_err());

        let mut rules = default_rules();
        rules.winner_election_mode = "firstPastThePost".to_string();
        assert!(validate_config(&minimal_config(rules)).is_err());
    }

    #[test]
    fn seed_is_required_for_random_mode() {
        let mut rules = default_rules();
        rules.tiebreak_mode = "random".to_string();
        assert!(validate_config(&minimal_config(rules)).is_err());

        let mut rules = default_rules();
        rules.tiebreak_mode = "random".to_string();
        rules.random_seed = Some("1234".to_string());
        let (config, _) = validate_config(&minimal_config(rules)).unwrap();
        assert_eq!(config.random_seed, Some(1234));
    }

    #[test]
    fn excel_style_column_letters_are_understood() {
        assert_eq!(read_js_int(&Some(serde_json::json!("c"))).unwrap(), 3);
        assert_eq!(read_js_int(&Some(serde_json::json!(4))).unwrap(), 4);
        assert_eq!(read_js_int(&Some(serde_json::json!("12"))).unwrap(), 12);
    }
}
