pub mod config_reader;
pub mod io_common;
pub mod io_csv;

pub use log::{debug, info, warn};

use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::{ResultExt, Snafu};
use text_diff::print_diff;

use ranked_tabulation::{
    run_contest, ContestOutcome, LogObserver, RoundRecord, TabulationOptions, TabulationResult,
    TransferSource, TransferTarget,
};

pub use crate::rcv::config_reader::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RcvError {
    #[snafu(display("could not open json file {}: {}", path, source))]
    OpeningJson {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("could not parse json content: {}", source))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("could not parse a number in the json content"))]
    ParsingJsonNumber {},
    #[snafu(display("could not open the csv file: {}", source))]
    CsvOpen { source: csv::Error },
    #[snafu(display("could not parse a csv line: {}", source))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("csv line {} is too short", lineno))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("could not write the summary to {}: {}", path, source))]
    WritingSummary {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("tabulation failed: {}", message))]
    Tabulation { message: String },
    #[snafu(whatever, display("{}", message))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RcvResult<T> = Result<T, RcvError>;
pub type BRcvResult<T> = Result<T, Box<RcvError>>;

impl RcvError {
    /// Boxed ad-hoc error for the driver functions.
    pub fn msg(message: impl Into<String>) -> Box<RcvError> {
        Box::new(RcvError::Whatever {
            message: message.into(),
            source: None,
        })
    }
}

/// One ballot as it comes out of a reader, before label normalization. Each
/// entry of `choices` is one rank; most formats put one mark in a cell.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub id: Option<String>,
    pub precinct: Option<String>,
    pub count: Option<u64>,
    pub choices: Vec<Vec<String>>,
}

/// Runs a full election from a JSON contest configuration: read the ballot
/// sources, tabulate, write the summary, and optionally compare it against a
/// reference summary.
pub fn run_election(
    config_path: String,
    check_summary_path: Option<String>,
    out_path: Option<String>,
) -> BRcvResult<()> {
    let config_str = fs::read_to_string(&config_path).context(OpeningJsonSnafu {
        path: config_path.clone(),
    })?;
    let config: RcvConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    debug!("run_election: config: {:?}", config);

    let (rules, candidates) = validate_config(&config)?;

    if config.cvr_file_sources.is_empty() {
        return Err(RcvError::msg("no cvr file sources in the configuration"));
    }
    let root = Path::new(&config_path)
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();

    let mut ballots = Vec::new();
    for cfs in &config.cvr_file_sources {
        let path = root.join(&cfs.file_path);
        let path = path.as_path().display().to_string();
        info!("Attempting to read rank file {:?}", path);
        let parsed = match cfs.provider.as_str() {
            "csv" => io_csv::read_csv_ballots(&path, cfs)?,
            other => return Err(RcvError::msg(format!("provider not supported: {}", other))),
        };
        ballots.extend(io_common::assemble_ballots(&parsed, cfs, &rules, &candidates)?);
    }
    info!("Parsed {} cast vote records.", ballots.len());

    info!("Tabulating '{}'...", config.output_settings.contest_name);
    let mut observer = LogObserver::default();
    let options = TabulationOptions {
        observer: Some(&mut observer),
        ..Default::default()
    };
    let outcome = run_contest(&candidates, &ballots, &rules, options).map_err(|error| {
        Box::new(RcvError::Tabulation {
            message: error.to_string(),
        })
    })?;

    let summary = build_summary_js(&config, &outcome);
    let pretty_js_stats = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    match &out_path {
        Some(path) if path != "stdout" => {
            fs::write(path, &pretty_js_stats).context(WritingSummarySnafu { path: path.clone() })?;
            info!("Results written to: {}", path);
        }
        _ => println!("{}", pretty_js_stats),
    }

    // The reference summary, if provided for comparison.
    if let Some(summary_path) = check_summary_path {
        let summary_ref = read_summary(summary_path)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return Err(RcvError::msg(
                "difference detected between calculated summary and reference summary",
            ));
        }
    }

    Ok(())
}

pub fn read_summary(path: String) -> BRcvResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn build_summary_js(config: &RcvConfig, outcome: &ContestOutcome) -> JSValue {
    match outcome {
        ContestOutcome::Single(result) => {
            let output_config = summary_config(config, Some(result.threshold.to_string()));
            let mut summary = json!({
                "config": output_config,
                "results": result_stats_to_json(result),
            });
            if !result.precinct_tallies.is_empty() {
                let mut precincts: JSMap<String, JSValue> = JSMap::new();
                for (precinct, rounds) in &result.precinct_tallies {
                    let tallies: Vec<JSValue> = rounds
                        .iter()
                        .enumerate()
                        .map(|(idx, tally)| {
                            let mut entries: JSMap<String, JSValue> = JSMap::new();
                            for (name, votes) in tally {
                                entries.insert(name.clone(), json!(votes.to_string()));
                            }
                            json!({"round": idx + 1, "tally": entries})
                        })
                        .collect();
                    precincts.insert(precinct.clone(), JSValue::Array(tallies));
                }
                summary["precinctResults"] = JSValue::Object(precincts);
            }
            summary
        }
        ContestOutcome::Sequential(sequential) => {
            let output_config = summary_config(config, None);
            let passes: Vec<JSValue> = sequential
                .passes
                .iter()
                .map(|pass| {
                    json!({
                        "threshold": pass.threshold.to_string(),
                        "results": result_stats_to_json(pass),
                    })
                })
                .collect();
            json!({
                "config": output_config,
                "sequentialWinners": sequential.winners,
                "passes": passes,
            })
        }
    }
}

fn summary_config(config: &RcvConfig, threshold: Option<String>) -> OutputConfig {
    OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_juridiction.clone(),
        office: config.output_settings.contest_office.clone(),
        threshold,
    }
}

fn result_stats_to_json(result: &TabulationResult) -> Vec<JSValue> {
    let mut rounds_js: Vec<JSValue> = Vec::new();
    let num_rounds = result.rounds.len();
    for (idx, round) in result.rounds.iter().enumerate() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (name, votes) in &round.tally {
            tally.insert(name.clone(), json!(votes.to_string()));
        }

        let mut tally_results: Vec<JSValue> = Vec::new();
        // A candidate's votes move while the next round is tallied.
        let next_round = result.rounds.get(idx + 1);
        for eliminated in &round.eliminated {
            // The eliminated candidates are not output for the last round.
            if idx < num_rounds - 1 {
                tally_results.push(json!({
                    "eliminated": eliminated,
                    "transfers": transfers_from(next_round, eliminated),
                }));
            }
        }
        for winner in &round.elected {
            tally_results.push(json!({
                "elected": winner,
                "transfers": transfers_from(next_round, winner),
            }));
        }

        rounds_js.push(json!({
            "round": round.round,
            "tally": tally,
            "tallyResults": tally_results,
            "residualSurplus": round.residual_surplus.to_string(),
        }));
    }
    rounds_js
}

fn transfers_from(round: Option<&RoundRecord>, candidate: &str) -> JSMap<String, JSValue> {
    let mut transfers: JSMap<String, JSValue> = JSMap::new();
    let Some(round) = round else {
        return transfers;
    };
    for transfer in &round.transfers {
        if transfer.from != TransferSource::Candidate(candidate.to_string()) {
            continue;
        }
        let target = match &transfer.to {
            TransferTarget::Candidate(name) => name.clone(),
            TransferTarget::Exhausted => "exhausted".to_string(),
        };
        transfers.insert(target, json!(transfer.value.to_string()));
    }
    transfers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rcvtally-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_contest(dir: &Path) -> String {
        let config = r#"{
            "outputSettings": {
                "contestName": "Test Mayor",
                "contestDate": "2024-11-05",
                "contestJurisdiction": "Testville",
                "contestOffice": "Mayor"
            },
            "cvrFileSources": [
                {
                    "provider": "csv",
                    "filePath": "ballots.csv",
                    "firstVoteColumnIndex": 1
                }
            ],
            "candidates": [
                {"name": "Alpha"},
                {"name": "Bravo"},
                {"name": "Charlie"}
            ],
            "rules": {
                "tiebreakMode": "useCandidateOrder",
                "overvoteRule": "alwaysSkipToNextRank",
                "winnerElectionMode": "singleWinnerMajority",
                "numberOfWinners": "1",
                "maxSkippedRanksAllowed": "unlimited",
                "maxRankingsAllowed": "max"
            }
        }"#;
        let mut ballots = String::new();
        for _ in 0..5 {
            ballots.push_str("Alpha,,\n");
        }
        for _ in 0..3 {
            ballots.push_str("Bravo,Alpha,\n");
        }
        for _ in 0..2 {
            ballots.push_str("Charlie,Alpha,\n");
        }
        fs::write(dir.join("ballots.csv"), ballots).unwrap();
        let config_path = dir.join("contest.json");
        fs::write(&config_path, config).unwrap();
        config_path.display().to_string()
    }

    #[test]
    fn election_runs_end_to_end() {
        let dir = test_dir("e2e");
        let config_path = write_contest(&dir);
        let out_path = dir.join("summary.json").display().to_string();

        run_election(config_path, None, Some(out_path.clone())).unwrap();

        let summary = read_summary(out_path).unwrap();
        assert_eq!(summary["config"]["contest"], json!("Test Mayor"));
        assert_eq!(summary["config"]["threshold"], json!("6"));
        let results = summary["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["tally"]["Alpha"], json!("5"));
        assert_eq!(
            results[0]["tallyResults"][0]["eliminated"],
            json!("Charlie")
        );
        assert_eq!(
            results[0]["tallyResults"][0]["transfers"]["Alpha"],
            json!("2")
        );
        assert_eq!(results[1]["tally"]["Alpha"], json!("7"));
        assert_eq!(results[1]["tallyResults"][0]["elected"], json!("Alpha"));
    }

    #[test]
    fn summary_matches_itself_as_a_reference() {
        let dir = test_dir("reference");
        let config_path = write_contest(&dir);
        let first_out = dir.join("summary.json").display().to_string();
        let second_out = dir.join("summary2.json").display().to_string();
        run_election(config_path.clone(), None, Some(first_out.clone())).unwrap();
        run_election(config_path, Some(first_out), Some(second_out)).unwrap();
    }
}
