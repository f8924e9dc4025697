// Primitives for reading ballot CSV files.

use std::fs::File;
use std::path::Path;

use snafu::prelude::*;

use crate::tabulator::*;

pub fn read_csv_ballots(path: String, cfs: &FileSource) -> TabResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(&path);

    let id_idx_o = cfs.id_column_index_int()?;
    let choices_start_col = cfs.first_vote_column_index()?;
    let count_idx_o = cfs.count_column_index_int()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (records, row_offset) = get_records(&path, cfs)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset + 1;
        debug!("{:?} {:?}", lineno, line_r);
        let line = line_r.context(CsvLineParseSnafu {})?;
        let id = if let Some(id_idx) = id_idx_o {
            line.get(id_idx)
                .context(CsvLineTooShortSnafu { lineno })?
                .to_string()
        } else {
            default_id(lineno)
        };

        let count: Option<u64> = if let Some(count_idx) = count_idx_o {
            let cell = line.get(count_idx).context(CsvLineTooShortSnafu { lineno })?;
            match cell.trim().parse::<u64>() {
                Result::Ok(x) => Some(x),
                Result::Err(_) => {
                    whatever!("Row {}: cannot read a ballot count from {:?}", lineno, cell)
                }
            }
        } else {
            Some(1)
        };

        let choices: Vec<String> = line
            .iter()
            .skip(choices_start_col)
            .map(|s| s.to_string())
            .collect();
        debug!("read_csv_ballots: lineno: {:?} row: {:?}", lineno, &choices);

        let pb = ParsedBallot {
            id: Some(id),
            count,
            choices,
        };
        res.push(pb);
    }
    Ok(res)
}

fn get_records(
    path: &String,
    cfs: &FileSource,
) -> TabResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path.clone())
        .context(CsvOpenSnafu { path: path.clone() })?;
    let mut records = rdr.into_records();
    // The index starts at 1 to respect the conventions of the spreadsheet
    // world.
    for _ in 1..first_row {
        _ = records.next();
    }
    Ok((records, first_row - 1))
}

fn make_default_id(path: &String) -> impl Fn(usize) -> String {
    let simplified_file_name = Path::new(path.as_str())
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.clone());
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}
