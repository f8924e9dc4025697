//! Resolution engine for chamber seat elections: majority thresholds over
//! sequential rounds, top-2/top-3 runoff scoping and a deterministic
//! tie-break cascade. See the [manual] module for the input formats and
//! configuration accepted by the `chambertally` program.

mod config;
pub mod builder;
pub mod manual;
pub mod quick_start;

use log::{debug, info};

use std::{
    cmp::Reverse,
    collections::{HashMap, HashSet},
    ops::{Add, AddAssign},
};

pub use crate::config::*;

// **** Private structures ****

type PassId = u32;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

// Invariant: prefs holds declared candidates only, each at most once.
#[derive(Eq, PartialEq, Debug, Clone)]
struct BallotInternal {
    prefs: Vec<CandidateId>,
    count: VoteCount,
}

/// Primary-choice counts for one round, with the valid-vote total used as
/// the denominator of every threshold comparison.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Tally {
    counts: HashMap<CandidateId, VoteCount>,
    total_valid: VoteCount,
}

impl Tally {
    fn count(&self, cid: CandidateId) -> VoteCount {
        self.counts.get(&cid).cloned().unwrap_or(VoteCount::EMPTY)
    }

    /// Candidates by decreasing count. Equal counts are ordered by id so
    /// the output is deterministic; the order inside a group carries no
    /// meaning.
    fn sorted_desc(&self) -> Vec<(CandidateId, VoteCount)> {
        let mut res: Vec<(CandidateId, VoteCount)> =
            self.counts.iter().map(|(&cid, &vc)| (cid, vc)).collect();
        res.sort_by_key(|&(cid, vc)| (Reverse(vc), cid));
        res
    }

    fn top_n_sum(&self, n: usize) -> VoteCount {
        self.sorted_desc().iter().take(n).map(|&(_, vc)| vc).sum()
    }
}

// States of one seat-filling pass.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum RoundState {
    Round1,
    NeedsRunoffTop2,
    NeedsRunoffTop3,
    NeedsRunoffAll,
    Decided,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct Decision {
    cid: CandidateId,
    method: DecisionMethod,
}

// The absolute tie-break rule with candidate names already resolved.
#[derive(Eq, PartialEq, Debug, Clone)]
enum AbsolutePolicy {
    CandidateName,
    External(Vec<CandidateId>),
}

struct ElectionContext {
    ballots: Vec<BallotInternal>,
    names: HashMap<CandidateId, String>,
    presidential: Vec<CandidateId>,
    absolute: AbsolutePolicy,
}

impl ElectionContext {
    fn name(&self, cid: CandidateId) -> String {
        self.names.get(&cid).unwrap().clone()
    }
}

// Collects the per-round audit trail.
struct Recorder {
    stats: Vec<RoundStats>,
    seq: u32,
}

impl Recorder {
    fn new() -> Recorder {
        Recorder {
            stats: Vec::new(),
            seq: 0,
        }
    }

    fn tally_round(&mut self, pass: PassId, kind: RoundKind, tally: &Tally, ctx: &ElectionContext) {
        self.seq += 1;
        let out: Vec<(String, u64)> = tally
            .sorted_desc()
            .iter()
            .map(|&(cid, vc)| (ctx.name(cid), vc.0))
            .collect();
        self.stats.push(RoundStats {
            round: self.seq,
            pass,
            kind,
            valid_votes: tally.total_valid.0,
            tally: out,
        });
    }

    fn strategy_round(
        &mut self,
        pass: PassId,
        strategy: TiebreakStrategy,
        entries: &[(CandidateId, u64)],
        ctx: &ElectionContext,
    ) {
        self.seq += 1;
        let mut out: Vec<(String, u64)> = entries
            .iter()
            .map(|&(cid, v)| (ctx.name(cid), v))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let valid: u64 = entries.iter().map(|&(_, v)| v).sum();
        self.stats.push(RoundStats {
            round: self.seq,
            pass,
            kind: RoundKind::Tiebreak(strategy),
            valid_votes: valid,
            tally: out,
        });
    }

    // The original records a presidential decision as a single decisive
    // vote; the same convention covers the absolute rule.
    fn decisive_round(
        &mut self,
        pass: PassId,
        strategy: TiebreakStrategy,
        settled: &[CandidateId],
        examined: &[CandidateId],
        ctx: &ElectionContext,
    ) {
        let entries: Vec<(CandidateId, u64)> = examined
            .iter()
            .map(|&cid| (cid, if settled.contains(&cid) { 1 } else { 0 }))
            .collect();
        self.strategy_round(pass, strategy, &entries, ctx);
    }
}

// **** Ballot tally ****

/// Tallies the primary choices of the ballots, restricted to the active
/// pool. A ballot whose primary choice is not active is invalid for the
/// round: it is not counted and not redistributed, and it leaves the
/// valid-vote denominator. Every active candidate appears in the result,
/// with a zero count if nobody voted for them.
fn compute_tally(ballots: &[BallotInternal], active: &HashSet<CandidateId>) -> Tally {
    let mut counts: HashMap<CandidateId, VoteCount> = HashMap::new();
    for cid in active.iter() {
        counts.insert(*cid, VoteCount::EMPTY);
    }
    let mut total = VoteCount::EMPTY;
    for b in ballots.iter() {
        if let Some(first) = b.prefs.first() {
            if let Some(vc) = counts.get_mut(first) {
                *vc += b.count;
                total += b.count;
            }
        }
    }
    Tally {
        counts,
        total_valid: total,
    }
}

/// Like [compute_tally], but fails when no valid vote exists. The round
/// resolver recovers from this case locally.
fn checked_tally(
    ballots: &[BallotInternal],
    active: &HashSet<CandidateId>,
) -> Result<Tally, ElectionErrors> {
    let tally = compute_tally(ballots, active);
    if tally.total_valid == VoteCount::EMPTY {
        return Err(ElectionErrors::EmptyElectorate);
    }
    Ok(tally)
}

// **** Threshold comparisons ****
// Integer comparisons throughout: an exact half is never a majority.

fn has_majority(count: VoteCount, total_valid: VoteCount) -> bool {
    count.0 * 2 > total_valid.0
}

/// Whether the n strongest candidates together hold a strict majority.
fn top_share_over_half(tally: &Tally, n: usize) -> bool {
    has_majority(tally.top_n_sum(n), tally.total_valid)
}

// **** Tie-break cascade ****

/// The outcome of ordering a tied group by one scoring criterion: the
/// candidates the criterion settled into the open slots, and the subgroup
/// it could not separate.
struct Refinement {
    settled: Vec<CandidateId>,
    residual: Vec<CandidateId>,
    residual_slots: usize,
}

fn refine_by<F>(group: &[CandidateId], slots: usize, score: F) -> Refinement
where
    F: Fn(CandidateId) -> u64,
{
    let mut scored: Vec<(CandidateId, u64)> = group.iter().map(|&c| (c, score(c))).collect();
    scored.sort_by_key(|&(cid, s)| (Reverse(s), cid));
    let mut settled: Vec<CandidateId> = Vec::new();
    let mut idx = 0;
    let mut left = slots;
    while idx < scored.len() && left > 0 {
        let s = scored[idx].1;
        let mut end = idx;
        while end < scored.len() && scored[end].1 == s {
            end += 1;
        }
        if end - idx <= left {
            settled.extend(scored[idx..end].iter().map(|p| p.0));
            left -= end - idx;
            idx = end;
        } else {
            return Refinement {
                settled,
                residual: scored[idx..end].iter().map(|p| p.0).collect(),
                residual_slots: left,
            };
        }
    }
    Refinement {
        settled,
        residual: Vec::new(),
        residual_slots: 0,
    }
}

/// Position of a candidate in a preference order, as a score where higher
/// wins. Candidates absent from the order all score zero.
fn order_score(order: &[CandidateId], c: CandidateId) -> u64 {
    match order.iter().position(|&o| o == c) {
        Some(idx) => (order.len() - idx) as u64,
        None => 0,
    }
}

/// Support for the tied group at one preference rank (1-based; rank 2 is
/// the second choice of each ballot).
fn preference_rank_counts(
    ballots: &[BallotInternal],
    group: &[CandidateId],
    rank: usize,
) -> HashMap<CandidateId, u64> {
    let mut res: HashMap<CandidateId, u64> = group.iter().map(|&c| (c, 0)).collect();
    for b in ballots.iter() {
        if let Some(cid) = b.prefs.get(rank - 1) {
            if let Some(e) = res.get_mut(cid) {
                *e += b.count.0;
            }
        }
    }
    res
}

/// Selects exactly `slots` candidates out of a group tied on vote counts,
/// applying the cascade strategies in their fixed order. Each strategy only
/// refines the subgroup left tied by the previous ones; a strategy that
/// fills the remaining slots stops the cascade.
fn tiebreak_cascade(
    ctx: &ElectionContext,
    tied: &[CandidateId],
    slots: usize,
    pass: PassId,
    rec: &mut Recorder,
) -> Result<Vec<(CandidateId, TiebreakStrategy)>, ElectionErrors> {
    assert!(slots >= 1 && slots < tied.len(), "not a tie: {:?}", tied);
    debug!(
        "tiebreak_cascade: pass {} tied {:?} for {} slot(s)",
        pass, tied, slots
    );
    let mut chosen: Vec<(CandidateId, TiebreakStrategy)> = Vec::new();
    let mut residual: Vec<CandidateId> = tied.to_vec();
    let mut slots = slots;

    // Presidential preference order.
    if !ctx.presidential.is_empty() {
        let r = refine_by(&residual, slots, |c| order_score(&ctx.presidential, c));
        if !r.settled.is_empty() {
            rec.decisive_round(pass, TiebreakStrategy::Presidential, &r.settled, &residual, ctx);
            chosen.extend(
                r.settled
                    .iter()
                    .map(|&c| (c, TiebreakStrategy::Presidential)),
            );
        }
        if r.residual_slots == 0 {
            return Ok(chosen);
        }
        residual = r.residual;
        slots = r.residual_slots;
    }

    // Preference ranks, each rank strictly weaker than the previous one.
    let max_rank = ctx.ballots.iter().map(|b| b.prefs.len()).max().unwrap_or(0);
    for rank in 2..=max_rank {
        let counts = preference_rank_counts(&ctx.ballots, &residual, rank);
        let r = refine_by(&residual, slots, |c| counts[&c]);
        if !r.settled.is_empty() {
            let entries: Vec<(CandidateId, u64)> =
                residual.iter().map(|&c| (c, counts[&c])).collect();
            rec.strategy_round(pass, TiebreakStrategy::Preferential(rank as u32), &entries, ctx);
            chosen.extend(
                r.settled
                    .iter()
                    .map(|&c| (c, TiebreakStrategy::Preferential(rank as u32))),
            );
        }
        if r.residual_slots == 0 {
            return Ok(chosen);
        }
        residual = r.residual;
        slots = r.residual_slots;
    }

    // Absolute tie-break. Must order the residual group strictly.
    let order: Vec<CandidateId> = match &ctx.absolute {
        AbsolutePolicy::CandidateName => {
            let mut o = residual.clone();
            o.sort_by_key(|&c| ctx.name(c));
            o
        }
        AbsolutePolicy::External(o) => {
            if residual.iter().any(|c| !o.contains(c)) {
                let mut names: Vec<String> = residual.iter().map(|&c| ctx.name(c)).collect();
                names.sort();
                return Err(ElectionErrors::UnresolvedTie { candidates: names });
            }
            o.clone()
        }
    };
    let r = refine_by(&residual, slots, |c| order_score(&order, c));
    assert!(r.residual_slots == 0, "absolute tie-break must be total");
    rec.decisive_round(pass, TiebreakStrategy::Absolute, &r.settled, &residual, ctx);
    chosen.extend(r.settled.iter().map(|&c| (c, TiebreakStrategy::Absolute)));
    Ok(chosen)
}

// **** Round resolver ****

/// Picks the `n` strongest candidates of a tally. Count ties crossing the
/// boundary are resolved by the cascade; the strategy that settled each
/// pick is returned alongside it (`None` for picks settled by count).
fn select_strongest(
    ctx: &ElectionContext,
    tally: &Tally,
    n: usize,
    pass: PassId,
    rec: &mut Recorder,
) -> Result<Vec<(CandidateId, Option<TiebreakStrategy>)>, ElectionErrors> {
    let group: Vec<CandidateId> = tally.sorted_desc().iter().map(|p| p.0).collect();
    let r = refine_by(&group, n.min(group.len()), |c| tally.count(c).0);
    let mut res: Vec<(CandidateId, Option<TiebreakStrategy>)> =
        r.settled.iter().map(|&c| (c, None)).collect();
    if r.residual_slots > 0 {
        let picks = tiebreak_cascade(ctx, &r.residual, r.residual_slots, pass, rec)?;
        res.extend(picks.iter().map(|&(c, s)| (c, Some(s))));
    }
    Ok(res)
}

/// Runs a runoff restricted to the contested set and returns `slots`
/// winners. The runoff re-tallies primary choices against the narrowed
/// pool, so the denominator shrinks to the ballots still voting inside it.
fn run_runoff(
    ctx: &ElectionContext,
    contested: &[CandidateId],
    slots: usize,
    method: DecisionMethod,
    pass: PassId,
    rec: &mut Recorder,
) -> Result<Vec<Decision>, ElectionErrors> {
    assert!(slots < contested.len());
    let set: HashSet<CandidateId> = contested.iter().cloned().collect();
    let tally = compute_tally(&ctx.ballots, &set);
    rec.tally_round(pass, RoundKind::Runoff, &tally, ctx);
    info!(
        "run_runoff: pass {} {:?} among {} candidates for {} seat(s), {} valid votes",
        pass,
        method,
        contested.len(),
        slots,
        tally.total_valid.0
    );
    let picks = select_strongest(ctx, &tally, slots, pass, rec)?;
    Ok(picks
        .iter()
        .map(|&(cid, strat)| Decision {
            cid,
            method: match strat {
                None => method,
                Some(s) => DecisionMethod::Tiebreak(s),
            },
        })
        .collect())
}

/// The no-majority branch: scope the contest to the top 2 or top 3 when
/// they jointly hold a majority, otherwise reopen the full pool and reduce
/// it to two finalists.
fn resolve_without_majority(
    ctx: &ElectionContext,
    tally: &Tally,
    active: &[CandidateId],
    remaining: usize,
    pass: PassId,
    rec: &mut Recorder,
) -> Result<Vec<Decision>, ElectionErrors> {
    let state = if top_share_over_half(tally, 2) {
        RoundState::NeedsRunoffTop2
    } else if top_share_over_half(tally, 3) {
        RoundState::NeedsRunoffTop3
    } else {
        RoundState::NeedsRunoffAll
    };
    debug!(
        "resolve_without_majority: pass {} {:?} -> {:?}",
        pass,
        RoundState::Round1,
        state
    );
    let scoped = |st: RoundState| match st {
        RoundState::NeedsRunoffTop2 => (2, DecisionMethod::TopTwoRunoff),
        RoundState::NeedsRunoffTop3 => (3, DecisionMethod::TopThreeRunoff),
        _ => unreachable!(),
    };
    match state {
        RoundState::NeedsRunoffTop2 | RoundState::NeedsRunoffTop3 => {
            let (n, method) = scoped(state);
            let contested = select_strongest(ctx, tally, n, pass, rec)?;
            if remaining >= contested.len() {
                // The contested set exactly covers the remaining seats.
                Ok(contested
                    .iter()
                    .map(|&(cid, strat)| Decision {
                        cid,
                        method: match strat {
                            None => method,
                            Some(s) => DecisionMethod::Tiebreak(s),
                        },
                    })
                    .collect())
            } else {
                let members: Vec<CandidateId> = contested.iter().map(|p| p.0).collect();
                run_runoff(ctx, &members, remaining, method, pass, rec)
            }
        }
        RoundState::NeedsRunoffAll => {
            // The whole pool stays in play: the leader meets the leader of
            // the reduced pool in a two-way runoff.
            let first = select_strongest(ctx, tally, 1, pass, rec)?[0].0;
            let rest: Vec<CandidateId> = active.iter().cloned().filter(|&c| c != first).collect();
            if rest.is_empty() {
                return Ok(vec![Decision {
                    cid: first,
                    method: DecisionMethod::FullRunoff,
                }]);
            }
            let rest_set: HashSet<CandidateId> = rest.iter().cloned().collect();
            let sub_tally = compute_tally(&ctx.ballots, &rest_set);
            rec.tally_round(pass, RoundKind::Runoff, &sub_tally, ctx);
            let second = select_strongest(ctx, &sub_tally, 1, pass, rec)?[0].0;
            run_runoff(
                ctx,
                &[first, second],
                1,
                DecisionMethod::FullRunoff,
                pass,
                rec,
            )
        }
        _ => unreachable!(),
    }
}

/// Confirms part of a group of simultaneous majority winners when they
/// outnumber the remaining seats: strongest counts first, residual count
/// ties through the cascade.
fn select_overcrowd(
    ctx: &ElectionContext,
    majority: &[CandidateId],
    remaining: usize,
    tally: &Tally,
    pass: PassId,
    rec: &mut Recorder,
) -> Result<Vec<Decision>, ElectionErrors> {
    let r = refine_by(majority, remaining, |c| tally.count(c).0);
    let mut res: Vec<Decision> = r
        .settled
        .iter()
        .map(|&cid| Decision {
            cid,
            method: DecisionMethod::Tiebreak(TiebreakStrategy::FirstRoundCount),
        })
        .collect();
    if r.residual_slots > 0 {
        let picks = tiebreak_cascade(ctx, &r.residual, r.residual_slots, pass, rec)?;
        res.extend(picks.iter().map(|&(cid, s)| Decision {
            cid,
            method: DecisionMethod::Tiebreak(s),
        }));
    }
    Ok(res)
}

/// One seat-filling pass: tally the active pool, confirm majority winners,
/// otherwise work through the runoff branches. Always returns at least one
/// decision and never more than `remaining`.
fn run_seat_pass(
    ctx: &ElectionContext,
    active: &[CandidateId],
    remaining: usize,
    pass: PassId,
    rec: &mut Recorder,
) -> Result<Vec<Decision>, ElectionErrors> {
    let active_set: HashSet<CandidateId> = active.iter().cloned().collect();
    let tally = checked_tally(&ctx.ballots, &active_set).unwrap_or_else(|e| {
        // Legal per the round policy: a pass without valid votes simply
        // produces no majority winner.
        debug!("run_seat_pass: pass {}: {} (recovered)", pass, e);
        compute_tally(&ctx.ballots, &active_set)
    });
    rec.tally_round(pass, RoundKind::FirstRound, &tally, ctx);
    info!(
        "run_seat_pass: pass {} with {} candidates, {} seat(s) left, {} valid votes",
        pass,
        active.len(),
        remaining,
        tally.total_valid.0
    );

    let majority: Vec<CandidateId> = tally
        .sorted_desc()
        .iter()
        .filter(|&&(_, vc)| has_majority(vc, tally.total_valid))
        .map(|&(cid, _)| cid)
        .collect();
    debug!("run_seat_pass: pass {} majority winners {:?}", pass, majority);

    let decisions = match majority.len() {
        0 => resolve_without_majority(ctx, &tally, active, remaining, pass, rec)?,
        // A single majority winner takes one seat; any seats left are
        // resolved by the next pass over the reduced pool.
        1 => vec![Decision {
            cid: majority[0],
            method: DecisionMethod::Majority,
        }],
        m if m <= remaining => majority
            .iter()
            .map(|&cid| Decision {
                cid,
                method: DecisionMethod::Majority,
            })
            .collect(),
        _ => select_overcrowd(ctx, &majority, remaining, &tally, pass, rec)?,
    };
    debug!(
        "run_seat_pass: pass {} {:?} with {} decision(s)",
        pass,
        RoundState::Decided,
        decisions.len()
    );
    Ok(decisions)
}

// **** Input validation ****

struct CheckResult {
    ballots: Vec<BallotInternal>,
    candidates: Vec<(String, CandidateId)>,
}

// Candidates are returned in declaration order.
fn checks(
    coll: &[Ballot],
    reg_candidates: &[Candidate],
    rules: &ElectionRules,
) -> Result<CheckResult, ElectionErrors> {
    debug!("checks: {} raw ballots", coll.len());
    let mut by_name: HashMap<String, CandidateId> = HashMap::new();
    for (idx, c) in reg_candidates.iter().enumerate() {
        let cid = CandidateId((idx + 1) as u32);
        if by_name.insert(c.name.clone(), cid).is_some() {
            return Err(ElectionErrors::DuplicateCandidate {
                name: c.name.clone(),
            });
        }
    }

    let mut seen_voters: HashSet<String> = HashSet::new();
    let mut ballots: Vec<BallotInternal> = Vec::new();
    for (idx, b) in coll.iter().enumerate() {
        let voter_label = b
            .voter
            .clone()
            .unwrap_or_else(|| format!("ballot {}", idx + 1));
        if let Some(v) = &b.voter {
            if !seen_voters.insert(v.clone()) {
                return Err(ElectionErrors::DuplicateVoter { voter: v.clone() });
            }
        }
        if let Some(max) = rules.max_rankings_allowed {
            if b.choices.len() > max as usize {
                return Err(ElectionErrors::TooManyRankings {
                    voter: voter_label,
                    max,
                });
            }
        }
        let mut prefs: Vec<CandidateId> = Vec::new();
        for name in b.choices.iter() {
            let cid = by_name
                .get(name)
                .cloned()
                .ok_or_else(|| ElectionErrors::UnknownCandidate {
                    context: format!("ballot of {}", voter_label),
                    name: name.clone(),
                })?;
            // A repeated name keeps its best rank.
            if !prefs.contains(&cid) {
                prefs.push(cid);
            }
        }
        ballots.push(BallotInternal {
            prefs,
            count: VoteCount(b.count),
        });
    }

    let candidates: Vec<(String, CandidateId)> = reg_candidates
        .iter()
        .map(|c| (c.name.clone(), by_name[&c.name]))
        .collect();
    debug!("checks: {} validated ballots", ballots.len());
    Ok(CheckResult {
        ballots,
        candidates,
    })
}

fn resolve_order(
    order: &[String],
    by_name: &HashMap<String, CandidateId>,
    what: &str,
) -> Result<Vec<CandidateId>, ElectionErrors> {
    let mut res: Vec<CandidateId> = Vec::new();
    for name in order.iter() {
        let cid = by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ElectionErrors::UnknownCandidate {
                context: what.to_string(),
                name: name.clone(),
            })?;
        if !res.contains(&cid) {
            res.push(cid);
        }
    }
    Ok(res)
}

// **** Election driver ****

fn seat_label(rules: &ElectionRules, idx: usize) -> String {
    rules
        .seat_labels
        .get(idx)
        .cloned()
        .unwrap_or_else(|| format!("Seat {}", idx + 1))
}

/// Resolves a full election with the given rules for the given ballots.
///
/// Arguments:
/// * `coll` the ballots to process
/// * `rules` the rules that govern this election
/// * `candidates` the registered candidates
///
/// Returns the winners in decision order, one per configured seat, with the
/// audit trail of every counting round.
pub fn run_election(
    coll: &[Ballot],
    rules: &ElectionRules,
    candidates: &[Candidate],
) -> Result<ElectionResult, ElectionErrors> {
    info!(
        "run_election: processing {} ballots, {} candidates, {} seat(s)",
        coll.len(),
        candidates.len(),
        rules.seat_count
    );
    if rules.seat_count == 0 || rules.seat_count as usize > candidates.len() {
        return Err(ElectionErrors::InvalidSeatCount {
            seats: rules.seat_count,
            candidates: candidates.len(),
        });
    }

    let cr = checks(coll, candidates, rules)?;
    for (name, cid) in cr.candidates.iter() {
        info!("Candidate: {}: {}", cid.0, name);
    }

    let names: HashMap<CandidateId, String> = cr
        .candidates
        .iter()
        .map(|(name, cid)| (*cid, name.clone()))
        .collect();
    let by_name: HashMap<String, CandidateId> = cr
        .candidates
        .iter()
        .map(|(name, cid)| (name.clone(), *cid))
        .collect();
    let presidential = resolve_order(&rules.presidential_order, &by_name, "presidential order")?;
    let absolute = match &rules.tiebreak_policy {
        TiebreakPolicy::CandidateName => AbsolutePolicy::CandidateName,
        TiebreakPolicy::ExternalOrder(order) => {
            AbsolutePolicy::External(resolve_order(order, &by_name, "tie-break order")?)
        }
    };
    let ctx = ElectionContext {
        ballots: cr.ballots,
        names,
        presidential,
        absolute,
    };

    let seats = rules.seat_count as usize;
    let mut active: Vec<CandidateId> = cr.candidates.iter().map(|p| p.1).collect();
    let mut winners: Vec<SeatWinner> = Vec::new();
    let mut rec = Recorder::new();
    let mut pass: PassId = 0;
    while winners.len() < seats {
        pass += 1;
        let remaining = seats - winners.len();
        let decisions = run_seat_pass(&ctx, &active, remaining, pass, &mut rec)?;
        assert!(
            !decisions.is_empty() && decisions.len() <= remaining,
            "pass {} returned {} decisions for {} seat(s)",
            pass,
            decisions.len(),
            remaining
        );
        for d in decisions {
            // A confirmed winner leaves the pool for good.
            active.retain(|&c| c != d.cid);
            let label = seat_label(rules, winners.len());
            let name = ctx.name(d.cid);
            info!("run_election: {} -> {} ({:?})", label, name, d.method);
            winners.push(SeatWinner {
                seat: label,
                name,
                pass,
                decided_by: d.method,
            });
        }
    }

    Ok(ElectionResult {
        winners,
        round_stats: rec.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn cands(names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .map(|n| Candidate {
                name: n.to_string(),
                code: None,
            })
            .collect()
    }

    fn weighted(groups: &[(u64, &[&str])]) -> Vec<Ballot> {
        groups
            .iter()
            .map(|(count, choices)| Ballot {
                voter: None,
                choices: choices.iter().map(|c| c.to_string()).collect(),
                count: *count,
            })
            .collect()
    }

    fn rules(seats: u32) -> ElectionRules {
        ElectionRules {
            seat_count: seats,
            ..ElectionRules::DEFAULT_RULES
        }
    }

    fn test_tally(counts: &[(u32, u64)], total: u64) -> Tally {
        Tally {
            counts: counts
                .iter()
                .map(|&(id, c)| (CandidateId(id), VoteCount(c)))
                .collect(),
            total_valid: VoteCount(total),
        }
    }

    fn test_ctx(names: &[&str]) -> ElectionContext {
        ElectionContext {
            ballots: Vec::new(),
            names: names
                .iter()
                .enumerate()
                .map(|(idx, n)| (CandidateId((idx + 1) as u32), n.to_string()))
                .collect(),
            presidential: Vec::new(),
            absolute: AbsolutePolicy::CandidateName,
        }
    }

    fn tiebreak_kinds(result: &ElectionResult) -> Vec<TiebreakStrategy> {
        result
            .round_stats
            .iter()
            .filter_map(|rs| match rs.kind {
                RoundKind::Tiebreak(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn majority_is_strict() {
        assert!(!has_majority(VoteCount(5), VoteCount(10)));
        assert!(has_majority(VoteCount(6), VoteCount(10)));
        assert!(!has_majority(VoteCount(0), VoteCount(0)));
        assert!(has_majority(VoteCount(2), VoteCount(3)));
    }

    #[test]
    fn top_share_at_exact_half_continues() {
        let t = test_tally(&[(1, 6), (2, 6), (3, 5), (4, 4), (5, 3)], 24);
        assert!(!top_share_over_half(&t, 2));
        assert!(top_share_over_half(&t, 3));
    }

    #[test]
    fn tally_counts_primary_choices_only() {
        let ballots = vec![
            BallotInternal {
                prefs: vec![CandidateId(1), CandidateId(2)],
                count: VoteCount(3),
            },
            BallotInternal {
                prefs: vec![CandidateId(3), CandidateId(2)],
                count: VoteCount(2),
            },
        ];
        let active: HashSet<CandidateId> = [CandidateId(2), CandidateId(3)].into_iter().collect();
        let t = compute_tally(&ballots, &active);
        // The first ballot's primary choice is inactive: invalid for the
        // round, not transferred to the second choice.
        assert_eq!(t.count(CandidateId(2)), VoteCount::EMPTY);
        assert_eq!(t.count(CandidateId(3)), VoteCount(2));
        assert_eq!(t.total_valid, VoteCount(2));
    }

    #[test]
    fn tally_without_valid_votes_fails() {
        let ballots = vec![BallotInternal {
            prefs: vec![],
            count: VoteCount(4),
        }];
        let active: HashSet<CandidateId> = [CandidateId(1)].into_iter().collect();
        assert_eq!(
            checked_tally(&ballots, &active),
            Err(ElectionErrors::EmptyElectorate)
        );
    }

    #[test]
    fn majority_winner_single_round() {
        init_logs();
        let candidates = cands(&["Ana", "Bruno", "Carla"]);
        let ballots = weighted(&[(6, &["Ana"]), (3, &["Bruno"]), (2, &["Carla"])]);
        let res = run_election(&ballots, &rules(1), &candidates).unwrap();
        assert_eq!(res.winners.len(), 1);
        assert_eq!(res.winners[0].name, "Ana");
        assert_eq!(res.winners[0].decided_by, DecisionMethod::Majority);
        assert!(tiebreak_kinds(&res).is_empty());
    }

    #[test]
    fn first_round_overcrowd_keeps_strongest() {
        // Simultaneous majority winners can only be presented to the
        // classification layer, where the denominator is an independent
        // input.
        let ctx = test_ctx(&["Ana", "Bruno", "Carla"]);
        let t = test_tally(&[(1, 60), (2, 55), (3, 52)], 100);
        let majority: Vec<CandidateId> = t
            .sorted_desc()
            .iter()
            .filter(|&&(_, vc)| has_majority(vc, t.total_valid))
            .map(|&(cid, _)| cid)
            .collect();
        assert_eq!(majority.len(), 3);
        let mut rec = Recorder::new();
        let decisions = select_overcrowd(&ctx, &majority, 2, &t, 1, &mut rec).unwrap();
        assert_eq!(
            decisions,
            vec![
                Decision {
                    cid: CandidateId(1),
                    method: DecisionMethod::Tiebreak(TiebreakStrategy::FirstRoundCount),
                },
                Decision {
                    cid: CandidateId(2),
                    method: DecisionMethod::Tiebreak(TiebreakStrategy::FirstRoundCount),
                },
            ]
        );
    }

    #[test]
    fn tied_second_place_goes_to_presidential_order() {
        init_logs();
        let candidates = cands(&["Ana", "Bea", "Cid", "Dan"]);
        let ballots = weighted(&[
            (8, &["Ana"]),
            (5, &["Bea"]),
            (5, &["Cid"]),
            (2, &["Dan"]),
        ]);
        let mut r = rules(1);
        r.presidential_order = vec!["Bea".to_string()];
        let res = run_election(&ballots, &r, &candidates).unwrap();
        // No majority (8/20); the top two hold 13/20, and the second place
        // is decided by the presidential order, not by raw counts.
        assert_eq!(res.winners[0].name, "Ana");
        assert_eq!(res.winners[0].decided_by, DecisionMethod::TopTwoRunoff);
        assert_eq!(tiebreak_kinds(&res), vec![TiebreakStrategy::Presidential]);
        // The runoff was scoped to Ana and the presidential pick.
        let runoff = res
            .round_stats
            .iter()
            .find(|rs| rs.kind == RoundKind::Runoff)
            .unwrap();
        assert_eq!(runoff.valid_votes, 13);
        assert_eq!(
            runoff.tally,
            vec![("Ana".to_string(), 8), ("Bea".to_string(), 5)]
        );
    }

    #[test]
    fn deep_runoff_scopes_to_top_three() {
        init_logs();
        let candidates = cands(&["Ana", "Bruno", "Carla", "Dores", "Elio", "Fia", "Gil"]);
        let ballots = weighted(&[
            (51, &["Ana"]),
            (25, &["Bruno"]),
            (6, &["Carla"]),
            (5, &["Dores"]),
            (5, &["Elio"]),
            (4, &["Fia"]),
            (4, &["Gil"]),
        ]);
        let res = run_election(&ballots, &rules(3), &candidates).unwrap();
        let names: Vec<&str> = res.winners.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bruno", "Carla"]);
        assert_eq!(res.winners[0].decided_by, DecisionMethod::Majority);
        assert_eq!(res.winners[1].decided_by, DecisionMethod::Majority);
        assert_eq!(res.winners[2].decided_by, DecisionMethod::TopThreeRunoff);
        // The third seat went through a runoff among exactly three
        // candidates: 6 + 5 + 5 of the 24 votes still valid.
        let runoff = res
            .round_stats
            .iter()
            .find(|rs| rs.kind == RoundKind::Runoff)
            .unwrap();
        assert_eq!(runoff.tally.len(), 3);
        assert_eq!(runoff.valid_votes, 16);
    }

    #[test]
    fn confirmed_winners_leave_the_pool() {
        let candidates = cands(&["Ana", "Bruno", "Carla", "Dores", "Elio", "Fia", "Gil"]);
        let ballots = weighted(&[
            (51, &["Ana"]),
            (25, &["Bruno"]),
            (6, &["Carla"]),
            (5, &["Dores"]),
            (5, &["Elio"]),
            (4, &["Fia"]),
            (4, &["Gil"]),
        ]);
        let res = run_election(&ballots, &rules(3), &candidates).unwrap();
        assert_eq!(res.winners.len(), 3);
        for w in res.winners.iter() {
            for rs in res.round_stats.iter() {
                if rs.pass > w.pass && rs.kind == RoundKind::FirstRound {
                    assert!(
                        rs.tally.iter().all(|(name, _)| *name != w.name),
                        "{} still contesting in pass {}",
                        w.name,
                        rs.pass
                    );
                }
            }
        }
    }

    #[test]
    fn zero_vote_round_is_not_fatal() {
        init_logs();
        let candidates = cands(&["Xavier", "Yara"]);
        // One recorded abstention: present in the input, absent from every
        // denominator.
        let ballots = vec![Ballot {
            voter: Some("m-01".to_string()),
            choices: vec![],
            count: 1,
        }];
        let mut r = rules(1);
        r.presidential_order = vec!["Yara".to_string(), "Xavier".to_string()];
        let res = run_election(&ballots, &r, &candidates).unwrap();
        assert_eq!(res.winners[0].name, "Yara");
        assert_eq!(
            res.winners[0].decided_by,
            DecisionMethod::Tiebreak(TiebreakStrategy::Presidential)
        );
        let first = &res.round_stats[0];
        assert_eq!(first.kind, RoundKind::FirstRound);
        assert_eq!(first.valid_votes, 0);
    }

    #[test]
    fn second_preferences_break_the_tie() {
        init_logs();
        let candidates = cands(&["Ana", "Bea"]);
        let ballots = weighted(&[(2, &["Ana"]), (1, &["Bea", "Ana"]), (1, &["Bea"])]);
        let res = run_election(&ballots, &rules(1), &candidates).unwrap();
        assert_eq!(res.winners[0].name, "Ana");
        assert_eq!(
            res.winners[0].decided_by,
            DecisionMethod::Tiebreak(TiebreakStrategy::Preferential(2))
        );
        // The rank that resolves the group stops the cascade.
        assert_eq!(
            tiebreak_kinds(&res),
            vec![TiebreakStrategy::Preferential(2)]
        );
    }

    #[test]
    fn full_cascade_falls_back_to_lexical() {
        init_logs();
        let candidates = cands(&["Zed", "Amy"]);
        let ballots = weighted(&[(1, &["Zed", "Amy"]), (1, &["Amy", "Zed"])]);
        let res = run_election(&ballots, &rules(1), &candidates).unwrap();
        assert_eq!(res.winners[0].name, "Amy");
        assert_eq!(
            res.winners[0].decided_by,
            DecisionMethod::Tiebreak(TiebreakStrategy::Absolute)
        );
        // Determinism: the same input always produces the same winner.
        let again = run_election(&ballots, &rules(1), &candidates).unwrap();
        assert_eq!(res, again);
    }

    #[test]
    fn external_order_must_cover_the_tie() {
        let candidates = cands(&["Zed", "Amy"]);
        let ballots = weighted(&[(1, &["Zed", "Amy"]), (1, &["Amy", "Zed"])]);
        let mut r = rules(1);
        r.tiebreak_policy = TiebreakPolicy::ExternalOrder(vec![]);
        let res = run_election(&ballots, &r, &candidates);
        assert_eq!(
            res,
            Err(ElectionErrors::UnresolvedTie {
                candidates: vec!["Amy".to_string(), "Zed".to_string()],
            })
        );
    }

    #[test]
    fn external_order_resolves_the_tie() {
        let candidates = cands(&["Zed", "Amy"]);
        let ballots = weighted(&[(1, &["Zed", "Amy"]), (1, &["Amy", "Zed"])]);
        let mut r = rules(1);
        r.tiebreak_policy =
            TiebreakPolicy::ExternalOrder(vec!["Zed".to_string(), "Amy".to_string()]);
        let res = run_election(&ballots, &r, &candidates).unwrap();
        assert_eq!(res.winners[0].name, "Zed");
        assert_eq!(
            res.winners[0].decided_by,
            DecisionMethod::Tiebreak(TiebreakStrategy::Absolute)
        );
    }

    #[test]
    fn seat_count_must_fit_the_pool() {
        let candidates = cands(&["Ana", "Bea"]);
        let ballots = weighted(&[(1, &["Ana"])]);
        assert_eq!(
            run_election(&ballots, &rules(0), &candidates),
            Err(ElectionErrors::InvalidSeatCount {
                seats: 0,
                candidates: 2,
            })
        );
        assert_eq!(
            run_election(&ballots, &rules(3), &candidates),
            Err(ElectionErrors::InvalidSeatCount {
                seats: 3,
                candidates: 2,
            })
        );
    }

    #[test]
    fn duplicate_voters_are_rejected() {
        let candidates = cands(&["Ana", "Bea"]);
        let ballots = vec![
            Ballot {
                voter: Some("m-07".to_string()),
                choices: vec!["Ana".to_string()],
                count: 1,
            },
            Ballot {
                voter: Some("m-07".to_string()),
                choices: vec!["Bea".to_string()],
                count: 1,
            },
        ];
        assert_eq!(
            run_election(&ballots, &rules(1), &candidates),
            Err(ElectionErrors::DuplicateVoter {
                voter: "m-07".to_string(),
            })
        );
    }

    #[test]
    fn unknown_names_are_rejected_at_the_boundary() {
        let candidates = cands(&["Ana", "Bea"]);
        let ballots = weighted(&[(1, &["Nadia"])]);
        assert!(matches!(
            run_election(&ballots, &rules(1), &candidates),
            Err(ElectionErrors::UnknownCandidate { .. })
        ));
        let ballots = weighted(&[(1, &["Ana"])]);
        let mut r = rules(1);
        r.presidential_order = vec!["Nadia".to_string()];
        assert!(matches!(
            run_election(&ballots, &r, &candidates),
            Err(ElectionErrors::UnknownCandidate { .. })
        ));
    }

    #[test]
    fn over_long_ballots_are_rejected() {
        let candidates = cands(&["Ana", "Bea", "Cid"]);
        let ballots = vec![Ballot {
            voter: Some("m-01".to_string()),
            choices: vec!["Ana".to_string(), "Bea".to_string(), "Cid".to_string()],
            count: 1,
        }];
        let mut r = rules(1);
        r.max_rankings_allowed = Some(2);
        assert_eq!(
            run_election(&ballots, &r, &candidates),
            Err(ElectionErrors::TooManyRankings {
                voter: "m-01".to_string(),
                max: 2,
            })
        );
    }

    #[test]
    fn seat_labels_follow_decision_order() {
        let candidates = cands(&["Ana", "Bruno", "Carla"]);
        let ballots = weighted(&[(4, &["Ana"]), (2, &["Bruno"]), (1, &["Carla"])]);
        let mut r = rules(2);
        r.seat_labels = vec!["I Vogal".to_string(), "II Vogal".to_string()];
        let res = run_election(&ballots, &r, &candidates).unwrap();
        assert_eq!(res.winners[0].seat, "I Vogal");
        assert_eq!(res.winners[1].seat, "II Vogal");
        assert_eq!(res.winners[0].name, "Ana");
    }
}
