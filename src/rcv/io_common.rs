use std::path::Path;

use ranked_tabulation::{Ballot, Candidate, TabulationConfig};

use crate::rcv::config_reader::UNDECLARED_WRITE_IN_LABEL;
use crate::rcv::{FileSource, ParsedBallot, RcvResult};
use snafu::whatever;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn make_default_id_lineno(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// Turns raw parsed ballots into engine ballots, applying the source's label
/// conventions: undervote labels and blanks skip a rank, the overvote label
/// normalizes to the engine's explicit overvote mark, a delimiter splits one
/// cell into several marks, and write-in labels map to the shared undeclared
/// write-in candidate. Unrecognized names are an error.
pub fn assemble_ballots(
    parsed: &[ParsedBallot],
    source: &FileSource,
    rules: &TabulationConfig,
    candidates: &[Candidate],
) -> RcvResult<Vec<Ballot>> {
    let treat_blank_as_write_in = source.treat_blank_as_undeclared_write_in.unwrap_or(false);
    let mut ballots: Vec<Ballot> = Vec::with_capacity(parsed.len());

    for ballot in parsed {
        if let Some(max_rankings) = rules.max_rankings_allowed {
            if ballot.choices.len() as u32 > max_rankings {
                whatever!(
                    "ballot {:?} carries {} rankings, more than the {} allowed",
                    ballot.id,
                    ballot.choices.len(),
                    max_rankings
                );
            }
        }

        let mut assembled = Ballot::new();
        assembled.id = ballot.id.clone();
        assembled.precinct = ballot.precinct.clone();
        for (idx, cell) in ballot.choices.iter().enumerate() {
            let rank = idx as u32 + 1;
            let mut marks: Vec<String> = Vec::new();
            for raw in cell {
                let raw = raw.trim();
                if raw.is_empty() {
                    if treat_blank_as_write_in {
                        marks.push(UNDECLARED_WRITE_IN_LABEL.to_string());
                    }
                    continue;
                }
                if Some(raw) == source.undervote_label.as_deref() {
                    continue;
                }
                if Some(raw) == source.overvote_label.as_deref() {
                    marks.push(rules.explicit_overvote_label.clone());
                    continue;
                }
                let parts: Vec<&str> = match &source.overvote_delimiter {
                    Some(delimiter) => raw.split(delimiter.as_str()).collect(),
                    None => vec![raw],
                };
                for part in parts {
                    let part = part.trim();
                    if part.is_empty() {
                        continue;
                    }
                    marks.push(resolve_candidate(part, source, candidates)?);
                }
            }
            if !marks.is_empty() {
                assembled.rankings.insert(rank, marks);
            }
        }

        let count = ballot.count.unwrap_or(1);
        for _ in 0..count {
            ballots.push(assembled.clone());
        }
    }
    Ok(ballots)
}

fn resolve_candidate(
    name: &str,
    source: &FileSource,
    candidates: &[Candidate],
) -> RcvResult<String> {
    for candidate in candidates {
        if candidate.name == name || candidate.code.as_deref() == Some(name) {
            return Ok(candidate.name.clone());
        }
    }
    if Some(name) == source.undeclared_write_in_label.as_deref() {
        return Ok(UNDECLARED_WRITE_IN_LABEL.to_string());
    }
    whatever!("source file contains an unrecognized candidate: {}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> FileSource {
        serde_json::from_str(
            r#"{
                "provider": "csv",
                "filePath": "ballots.csv",
                "firstVoteColumnIndex": 1,
                "overvoteDelimiter": "|",
                "overvoteLabel": "OVERVOTE",
                "undervoteLabel": "UNDERVOTE",
                "undeclaredWriteInLabel": "UWI"
            }"#,
        )
        .unwrap()
    }

    fn candidates() -> Vec<Candidate> {
        vec![Candidate::new("Alpha"), Candidate::new("Bravo")]
    }

    fn parsed(choices: Vec<Vec<&str>>) -> ParsedBallot {
        ParsedBallot {
            id: Some("b-1".to_string()),
            precinct: None,
            count: Some(1),
            choices: choices
                .into_iter()
                .map(|cell| cell.into_iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn labels_normalize_to_engine_marks() {
        let rules = TabulationConfig::default();
        let ballots = assemble_ballots(
            &[parsed(vec![
                vec!["Alpha"],
                vec!["UNDERVOTE"],
                vec!["OVERVOTE"],
                vec!["UWI"],
            ])],
            &source(),
            &rules,
            &candidates(),
        )
        .unwrap();
        let rankings = &ballots[0].rankings;
        assert_eq!(rankings[&1], vec!["Alpha".to_string()]);
        assert!(!rankings.contains_key(&2));
        assert_eq!(rankings[&3], vec!["overvote".to_string()]);
        assert_eq!(rankings[&4], vec![UNDECLARED_WRITE_IN_LABEL.to_string()]);
    }

    #[test]
    fn delimiters_split_one_cell_into_many_marks() {
        let rules = TabulationConfig::default();
        let ballots = assemble_ballots(
            &[parsed(vec![vec!["Alpha|Bravo"]])],
            &source(),
            &rules,
            &candidates(),
        )
        .unwrap();
        assert_eq!(
            ballots[0].rankings[&1],
            vec!["Alpha".to_string(), "Bravo".to_string()]
        );
    }

    #[test]
    fn counts_replicate_ballots() {
        let rules = TabulationConfig::default();
        let mut ballot = parsed(vec![vec!["Alpha"]]);
        ballot.count = Some(3);
        let ballots = assemble_ballots(&[ballot], &source(), &rules, &candidates()).unwrap();
        assert_eq!(ballots.len(), 3);
    }

    #[test]
    fn unrecognized_candidates_are_an_error() {
        let rules = TabulationConfig::default();
        let outcome = assemble_ballots(
            &[parsed(vec![vec!["Mystery"]])],
            &source(),
            &rules,
            &candidates(),
        );
        assert!(outcome.is_err());
    }
}
