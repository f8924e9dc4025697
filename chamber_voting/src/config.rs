// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// A declared candidate for one election.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Candidate {
    pub name: String,
    /// Optional short code used by some import formats.
    pub code: Option<String>,
}

/// One ballot: the ranked choices of a voter, most preferred first.
///
/// The first choice is the primary vote. The remaining choices are only
/// consulted when narrowing a runoff or breaking a tie. A ballot with no
/// choices is a recorded abstention: it is part of the input but never part
/// of the valid-vote denominator.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    /// Voter identifier. Ballots carrying the same identifier are rejected.
    /// `None` for pre-aggregated inputs.
    pub voter: Option<String>,
    pub choices: Vec<String>,
    /// The number of identical ballots this entry stands for.
    pub count: u64,
}

// ******** Output data structures *********

/// How a seat ended up being attributed.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DecisionMethod {
    /// A candidate cleared the strict majority threshold in the first round
    /// of a pass.
    Majority,
    /// Decided within a runoff restricted to the two strongest candidates.
    TopTwoRunoff,
    /// Decided within a runoff restricted to the three strongest candidates.
    TopThreeRunoff,
    /// Decided by a two-finalist runoff after the whole pool was reopened.
    FullRunoff,
    /// Decided by one of the tie-break strategies.
    Tiebreak(TiebreakStrategy),
}

/// The ordered strategies of the tie-break cascade.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TiebreakStrategy {
    /// Ordering by raw first-round vote count. Only applies to candidates
    /// that reached the majority threshold simultaneously.
    FirstRoundCount,
    /// The presiding officer's preference order.
    Presidential,
    /// Support at the given preference rank (2 = second choices, ...).
    Preferential(u32),
    /// The configured last-resort rule. Always total.
    Absolute,
}

/// A filled seat, in decision order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SeatWinner {
    pub seat: String,
    pub name: String,
    /// The seat-filling pass (1-based) that confirmed this winner.
    pub pass: u32,
    pub decided_by: DecisionMethod,
}

/// The nature of a recorded counting round.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RoundKind {
    /// Primary tally over the active pool at the start of a pass.
    FirstRound,
    /// Tally restricted to a contested subset.
    Runoff,
    /// A tie-break strategy application.
    Tiebreak(TiebreakStrategy),
}

/// Counts for one recorded round, for auditing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundStats {
    /// Global sequence number across the election, 1-based.
    pub round: u32,
    /// The seat-filling pass this round belongs to.
    pub pass: u32,
    pub kind: RoundKind,
    /// Votes counted towards the denominator in this round.
    pub valid_votes: u64,
    /// Per-candidate counts, strongest first.
    pub tally: Vec<(String, u64)>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionResult {
    /// Exactly `seat_count` winners, in decision order.
    pub winners: Vec<SeatWinner>,
    pub round_stats: Vec<RoundStats>,
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ElectionErrors {
    /// A round without any valid vote. Recovered internally: such a round
    /// simply produces no majority winner.
    EmptyElectorate,
    /// The whole cascade ran without separating the given candidates. Only
    /// reachable when the configured absolute tie-break is not total.
    UnresolvedTie { candidates: Vec<String> },
    InvalidSeatCount { seats: u32, candidates: usize },
    DuplicateVoter { voter: String },
    DuplicateCandidate { name: String },
    /// A name that does not match any declared candidate, in a ballot or in
    /// one of the configured orders.
    UnknownCandidate { context: String, name: String },
    TooManyRankings { voter: String, max: u32 },
}

impl Error for ElectionErrors {}

impl Display for ElectionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElectionErrors::EmptyElectorate => write!(f, "no valid vote in this round"),
            ElectionErrors::UnresolvedTie { candidates } => {
                write!(f, "unresolved tie between {}", candidates.join(", "))
            }
            ElectionErrors::InvalidSeatCount { seats, candidates } => write!(
                f,
                "cannot fill {} seat(s) from a pool of {} candidate(s)",
                seats, candidates
            ),
            ElectionErrors::DuplicateVoter { voter } => {
                write!(f, "more than one ballot for voter {}", voter)
            }
            ElectionErrors::DuplicateCandidate { name } => {
                write!(f, "candidate {} is declared more than once", name)
            }
            ElectionErrors::UnknownCandidate { context, name } => {
                write!(f, "{}: unknown candidate {}", context, name)
            }
            ElectionErrors::TooManyRankings { voter, max } => {
                write!(f, "ballot of {} ranks more than {} candidates", voter, max)
            }
        }
    }
}

// ********* Configuration **********

/// The rule for the absolute (last resort) tie-break.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TiebreakPolicy {
    /// Ascending lexical order of the candidate name. Total by construction.
    CandidateName,
    /// An explicit priority list. It must cover any group it is asked to
    /// separate, otherwise the election fails with `UnresolvedTie`.
    ExternalOrder(Vec<String>),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionRules {
    /// Number of seats to fill. Must be between 1 and the number of
    /// candidates.
    pub seat_count: u32,
    /// Labels for the seats, in decision order. Missing labels fall back to
    /// `Seat N`.
    pub seat_labels: Vec<String>,
    /// The presiding officer's tie-break preference, strongest first. May be
    /// partial or empty.
    pub presidential_order: Vec<String>,
    pub tiebreak_policy: TiebreakPolicy,
    /// Ballots ranking more candidates than this are rejected.
    pub max_rankings_allowed: Option<u32>,
}

impl ElectionRules {
    pub const DEFAULT_RULES: ElectionRules = ElectionRules {
        seat_count: 1,
        seat_labels: Vec::new(),
        presidential_order: Vec::new(),
        tiebreak_policy: TiebreakPolicy::CandidateName,
        max_rankings_allowed: None,
    };
}
