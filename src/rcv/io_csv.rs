// Primitives for reading CSV ballot files.

use std::io::Read;

use snafu::{OptionExt, ResultExt};

use crate::rcv::io_common::make_default_id_lineno;
use crate::rcv::*;

/// Reads one generic CSV cast-vote-record file. Every column from
/// `firstVoteColumnIndex` onward is a rank, in order; the optional id,
/// precinct and count columns sit in front of them.
pub fn read_csv_ballots(path: &str, cfs: &FileSource) -> BRcvResult<Vec<ParsedBallot>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {})?;
    collect_ballots(reader, path, cfs)
}

fn collect_ballots<R: Read>(
    reader: csv::Reader<R>,
    path: &str,
    cfs: &FileSource,
) -> BRcvResult<Vec<ParsedBallot>> {
    let default_id = make_default_id_lineno(path);

    let id_idx = cfs.id_column_index_int()?;
    let precinct_idx = cfs.precinct_column_index_int()?;
    let count_idx = cfs.count_column_index_int()?;
    let choices_start_col = cfs.first_vote_column_index()?;
    let first_row = cfs.first_vote_row_index()?;

    let mut records = reader.into_records();
    // The index starts at 1 to respect most conventions in the spreadsheet
    // world.
    for _ in 1..first_row {
        _ = records.next();
    }

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + first_row;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_ballots: line {}: {:?}", lineno, line);

        let id = if let Some(id_idx) = id_idx {
            line.get(id_idx)
                .context(CsvLineTooShortSnafu { lineno })?
                .to_string()
        } else {
            default_id(lineno)
        };

        let precinct = match precinct_idx {
            Some(precinct_idx) => {
                let raw = line
                    .get(precinct_idx)
                    .context(CsvLineTooShortSnafu { lineno })?;
                if raw.is_empty() {
                    None
                } else {
                    Some(raw.to_string())
                }
            }
            None => None,
        };

        let count: Option<u64> = match count_idx {
            Some(count_idx) => Some(
                line.get(count_idx)
                    .context(CsvLineTooShortSnafu { lineno })?
                    .parse::<u64>()
                    .ok()
                    .context(CsvLineTooShortSnafu { lineno })?,
            ),
            None => Some(1),
        };

        let choices: Vec<Vec<String>> = line
            .iter()
            .skip(choices_start_col)
            .map(|cell| vec![cell.to_string()])
            .collect();

        res.push(ParsedBallot {
            id: Some(id),
            precinct,
            count,
            choices,
        });
    }
    Ok(res)
}
