// Reading the JSON description of an election.

use crate::tabulator::*;

use snafu::prelude::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    pub chamber: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
}

/// The election metadata echoed at the top of the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub chamber: Option<String>,
    pub date: Option<String>,
    pub seats: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    // Numbers or spreadsheet column letters, 1-based in both cases.
    #[serde(rename = "firstVoteColumnIndex")]
    _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "idColumnIndex")]
    pub id_column_index: Option<JSValue>,
    #[serde(rename = "countColumnIndex")]
    pub count_column_index: Option<JSValue>,
}

impl FileSource {
    /// 0-based index of the first preference column.
    pub fn first_vote_column_index(&self) -> TabResult<usize> {
        let x = read_js_int(&self._first_vote_column_index)?;
        Ok(x - 1)
    }

    /// 1-based row where the votes start, following the conventions of
    /// spreadsheet software. Defaults to the row after a single header.
    pub fn first_vote_row_index(&self) -> TabResult<usize> {
        if self._first_vote_row_index.is_none() {
            return Ok(2);
        }
        read_js_int(&self._first_vote_row_index)
    }

    pub fn id_column_index_int(&self) -> TabResult<Option<usize>> {
        match &self.id_column_index {
            None => Ok(None),
            Some(_) => read_js_int(&self.id_column_index).map(|x| Some(x - 1)),
        }
    }

    pub fn count_column_index_int(&self) -> TabResult<Option<usize>> {
        match &self.count_column_index {
            None => Ok(None),
            Some(_) => read_js_int(&self.count_column_index).map(|x| Some(x - 1)),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCandidate {
    pub name: String,
    pub code: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRules {
    #[serde(rename = "seatCount")]
    pub seat_count: u32,
    #[serde(rename = "seatLabels")]
    pub seat_labels: Option<Vec<String>>,
    #[serde(rename = "presidentialOrder")]
    pub presidential_order: Option<Vec<String>>,
    #[serde(rename = "tiebreakPolicy")]
    pub tiebreak_policy: Option<String>,
    #[serde(rename = "externalTiebreakOrder")]
    pub external_tiebreak_order: Option<Vec<String>>,
    #[serde(rename = "maxRankingsAllowed")]
    pub max_rankings_allowed: Option<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "ballotFileSources")]
    pub ballot_file_sources: Vec<FileSource>,
    pub candidates: Vec<ConfigCandidate>,
    pub rules: ConfigRules,
}

pub fn read_summary(path: String) -> TabResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_summary: {:?}", js);
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> TabResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        // Spreadsheet-style column letters. Single letters only for now.
        Some(JSValue::String(s)) if s.chars().all(|c| c.is_alphabetic()) => {
            if s.chars().count() != 1 {
                return None.context(ParsingJsonNumberSnafu {});
            }
            let c1: char = s.to_lowercase().chars().next().unwrap();
            Ok((c1 as usize) - ('a' as usize) + 1)
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}
