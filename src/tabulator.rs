use log::{debug, info, warn};

use chamber_voting::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::tabulator::config_reader::*;
use crate::tabulator::io_csv::read_csv_ballots;

pub mod config_reader;
pub mod io_csv;

#[derive(Debug, Snafu)]
pub enum TabulationError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a number or a spreadsheet column letter"))]
    ParsingJsonNumber {},
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error opening ballot file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a ballot row"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Ballot row {lineno} has too few columns"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TabulationError>;

/// A ballot as parsed by the readers, before any validation against the
/// declared candidates.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub id: Option<String>,
    pub count: Option<u64>,
    pub choices: Vec<String>,
}

fn strategy_to_json(s: &TiebreakStrategy) -> JSValue {
    match s {
        TiebreakStrategy::FirstRoundCount => json!("firstRoundCount"),
        TiebreakStrategy::Presidential => json!("presidential"),
        TiebreakStrategy::Preferential(rank) => json!({ "preferential": rank }),
        TiebreakStrategy::Absolute => json!("absolute"),
    }
}

fn method_to_json(m: &DecisionMethod) -> JSValue {
    match m {
        DecisionMethod::Majority => json!("majority"),
        DecisionMethod::TopTwoRunoff => json!("topTwoRunoff"),
        DecisionMethod::TopThreeRunoff => json!("topThreeRunoff"),
        DecisionMethod::FullRunoff => json!("fullRunoff"),
        DecisionMethod::Tiebreak(s) => json!({ "tiebreak": strategy_to_json(s) }),
    }
}

fn round_kind_to_json(k: &RoundKind) -> JSValue {
    match k {
        RoundKind::FirstRound => json!("firstRound"),
        RoundKind::Runoff => json!("runoff"),
        RoundKind::Tiebreak(s) => json!({ "tiebreak": strategy_to_json(s) }),
    }
}

fn result_stats_to_json(res: &ElectionResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in res.round_stats.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (name, count) in round_stat.tally.iter() {
            tally.insert(name.clone(), json!(count.to_string()));
        }
        let js = json!({
            "round": round_stat.round,
            "pass": round_stat.pass,
            "kind": round_kind_to_json(&round_stat.kind),
            "validVotes": round_stat.valid_votes.to_string(),
            "tally": tally,
        });
        l.push(js);
    }
    l
}

fn winners_to_json(res: &ElectionResult) -> Vec<JSValue> {
    res.winners
        .iter()
        .map(|w| {
            json!({
                "seat": w.seat,
                "name": w.name,
                "pass": w.pass,
                "decidedBy": method_to_json(&w.decided_by),
            })
        })
        .collect()
}

fn build_summary_js(config: &ElectionConfig, rules: &ElectionRules, res: &ElectionResult) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        chamber: config.output_settings.chamber.clone(),
        date: config.output_settings.contest_date.clone(),
        seats: Some(rules.seat_count.to_string()),
    };
    json!({
        "config": c,
        "winners": winners_to_json(res),
        "rounds": result_stats_to_json(res),
    })
}

/// Maps the configured rules to the engine's rules, rejecting the options
/// that are not recognized.
fn validate_rules(config_rules: &ConfigRules) -> TabResult<ElectionRules> {
    let tiebreak_policy = match config_rules.tiebreak_policy.as_deref() {
        None | Some("candidateName") => TiebreakPolicy::CandidateName,
        Some("externalOrder") => match &config_rules.external_tiebreak_order {
            Some(order) if !order.is_empty() => TiebreakPolicy::ExternalOrder(order.clone()),
            _ => whatever!("tiebreakPolicy externalOrder requires a non-empty externalTiebreakOrder"),
        },
        Some(x) => {
            whatever!("Cannot use tiebreak policy {:?} (currently not implemented)", x)
        }
    };
    Ok(ElectionRules {
        seat_count: config_rules.seat_count,
        seat_labels: config_rules.seat_labels.clone().unwrap_or_default(),
        presidential_order: config_rules.presidential_order.clone().unwrap_or_default(),
        tiebreak_policy,
        max_rankings_allowed: config_rules.max_rankings_allowed,
    })
}

fn read_ballot_data(root_path: String, cfs: &FileSource) -> TabResult<Vec<Ballot>> {
    let p: PathBuf = [root_path, cfs.file_path.clone()].iter().collect();
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read ballot file {:?}", p2);
    let parsed_ballots = match cfs.provider.as_str() {
        "csv" => read_csv_ballots(p2, cfs),
        x => whatever!("Ballot file provider not implemented: {:?}", x),
    }?;
    Ok(assemble_ballots(&parsed_ballots))
}

/// Blank cells are skipped; a row with no choice at all stays in as a
/// recorded abstention. Names are checked by the engine, not here.
fn assemble_ballots(parsed_ballots: &[ParsedBallot]) -> Vec<Ballot> {
    let mut res: Vec<Ballot> = Vec::new();
    for pb in parsed_ballots.iter() {
        let choices: Vec<String> = pb
            .choices
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().to_string())
            .collect();
        debug!("Choices for ballot {:?}: {:?}", pb.id, choices);
        let count = pb.count.unwrap_or(1);
        if count > 0 {
            res.push(Ballot {
                voter: pb.id.clone(),
                choices,
                count,
            });
        }
    }
    res
}

pub fn run_tabulation(
    config_path: String,
    reference_path: Option<String>,
    out_path: Option<String>,
) -> TabResult<()> {
    let config_p = Path::new(config_path.as_str());
    let config_str = fs::read_to_string(config_path.clone()).context(OpeningJsonSnafu {
        path: config_path.clone(),
    })?;
    let config: ElectionConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    info!("config: {:?}", config);

    let rules = validate_rules(&config.rules)?;

    if config.ballot_file_sources.is_empty() {
        whatever!("No ballot file sources in the configuration");
    }

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let mut ballots: Vec<Ballot> = Vec::new();
    for cfs in config.ballot_file_sources.iter() {
        let mut file_data =
            read_ballot_data(root_p.as_os_str().to_str().unwrap().to_string(), cfs)?;
        ballots.append(&mut file_data);
    }
    info!("read {} ballots", ballots.len());

    let candidates: Vec<Candidate> = config
        .candidates
        .iter()
        .map(|c| Candidate {
            name: c.name.clone(),
            code: match c.code.clone() {
                Some(x) if x.is_empty() => None,
                x => x,
            },
        })
        .collect();

    let result = match run_election(&ballots, &rules, &candidates) {
        Result::Ok(x) => x,
        Result::Err(x) => {
            whatever!("Election error: {}", x)
        }
    };

    for w in result.winners.iter() {
        info!("{}: {}", w.seat, w.name);
    }

    // Assemble the final json
    let result_js = build_summary_js(&config, &rules, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match out_path.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingSummarySnafu {
                path: path.to_string(),
            })?;
            info!("summary written to {}", path);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = reference_path {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
fn test_wrapper(test_name: &str) {
    let _ = env_logger::builder().is_test(true).try_init();
    let test_dir = format!("{}/tests/data", env!("CARGO_MANIFEST_DIR"));
    info!("Running test {}", test_name);
    let res = run_tabulation(
        format!("{}/{}/{}_config.json", test_dir, test_name, test_name),
        Some(format!(
            "{}/{}/{}_expected_summary.json",
            test_dir, test_name, test_name
        )),
        None,
    );
    if let Err(e) = res {
        panic!("test {}: {}", test_name, e);
    }
}
