use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::config::LeagueParams;
use crate::model::{LeagueManager, MiniLeague, Position, Snapshot};
use crate::rankings::{Ranked, sort_ranked, top_n};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerPerformance {
    pub manager_id: u32,
    pub entry_name: String,
    pub player_name: String,
    pub rank: u32,
    pub total_points: i32,
    pub gameweeks: usize,
    pub avg_points: f64,
    /// 100 minus the sample deviation of gameweek points; higher is steadier.
    pub consistency: f64,
    pub best_gameweek: i32,
    pub worst_gameweek: i32,
    pub transfer_cost: u32,
    pub hits_taken: u32,
    pub points_per_hit: f64,
}

/// Ownership of one player across the league's fetched squads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueOwnershipRow {
    pub id: u32,
    pub web_name: String,
    pub team_name: String,
    pub position: Position,
    pub price: f64,
    pub total_points: i32,
    pub owners: u32,
    pub captain_count: u32,
    pub vice_captain_count: u32,
    pub league_ownership_percent: f64,
    pub global_ownership_percent: f64,
    /// Global ownership over league ownership (floored at 1%).
    pub differential_score: f64,
}

impl Ranked for LeagueOwnershipRow {
    fn rank_score(&self) -> f64 {
        self.differential_score
    }
    fn rank_points(&self) -> i32 {
        self.total_points
    }
    fn rank_id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadGameweek {
    pub event: u32,
    pub first_points: Option<i32>,
    pub second_points: Option<i32>,
    pub first_total: Option<i32>,
    pub second_total: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHead {
    pub first: ManagerPerformance,
    pub second: ManagerPerformance,
    /// First manager's total minus the second's.
    pub points_gap: i32,
    pub progression: Vec<HeadToHeadGameweek>,
    pub shared_players: Vec<String>,
    pub only_first: Vec<String>,
    pub only_second: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueRecommendations {
    pub manager_id: u32,
    /// Unowned players the league mostly ignores but the wider game rates.
    pub targets: Vec<LeagueOwnershipRow>,
    /// Unowned players most of the league already has.
    pub must_haves: Vec<LeagueOwnershipRow>,
    /// Owned players few rivals share.
    pub unique: Vec<LeagueOwnershipRow>,
}

pub fn manager_performance(manager: &LeagueManager) -> ManagerPerformance {
    let standing = &manager.standing;
    let points: Vec<f64> = manager.history.iter().map(|h| h.points as f64).collect();
    let n = points.len();
    let avg_points = if n == 0 {
        0.0
    } else {
        points.iter().sum::<f64>() / n as f64
    };
    let consistency = match n {
        0 => 0.0,
        1 => 100.0,
        _ => {
            let variance =
                points.iter().map(|p| (p - avg_points).powi(2)).sum::<f64>() / (n - 1) as f64;
            100.0 - variance.sqrt()
        }
    };
    let hits_taken = manager.history.iter().filter(|h| h.transfers_cost > 0).count() as u32;

    ManagerPerformance {
        manager_id: standing.manager_id,
        entry_name: standing.entry_name.clone(),
        player_name: standing.player_name.clone(),
        rank: standing.rank,
        total_points: standing.total_points,
        gameweeks: n,
        avg_points,
        consistency,
        best_gameweek: manager.history.iter().map(|h| h.points).max().unwrap_or(0),
        worst_gameweek: manager.history.iter().map(|h| h.points).min().unwrap_or(0),
        transfer_cost: manager.history.iter().map(|h| h.transfers_cost).sum(),
        hits_taken,
        points_per_hit: standing.total_points as f64 / hits_taken.max(1) as f64,
    }
}

/// League table order: rank, then manager id.
pub fn league_performance(league: &MiniLeague) -> Vec<ManagerPerformance> {
    let mut rows: Vec<ManagerPerformance> = league.managers.iter().map(manager_performance).collect();
    rows.sort_by_key(|r| (r.rank, r.manager_id));
    rows
}

/// Ownership over managers whose squad was fetched. Picks unknown to the
/// snapshot are skipped. Rows come back in differential order.
pub fn league_ownership(league: &MiniLeague, snapshot: &Snapshot) -> Vec<LeagueOwnershipRow> {
    let squads: Vec<_> = league.managers.iter().filter_map(|m| m.squad.as_ref()).collect();
    if squads.is_empty() {
        return Vec::new();
    }

    let mut counts: HashMap<u32, (u32, u32, u32)> = HashMap::new();
    for squad in &squads {
        let mut seen = HashSet::new();
        for pick in &squad.picks {
            if !seen.insert(pick.element) {
                continue;
            }
            let entry = counts.entry(pick.element).or_default();
            entry.0 += 1;
            entry.1 += u32::from(pick.is_captain);
            entry.2 += u32::from(pick.is_vice_captain);
        }
    }

    let managers = squads.len() as f64;
    let mut rows: Vec<LeagueOwnershipRow> = counts
        .into_iter()
        .filter_map(|(id, (owners, captains, vices))| {
            let player = snapshot.player(id)?;
            let league_pct = owners as f64 / managers * 100.0;
            Some(LeagueOwnershipRow {
                id,
                web_name: player.web_name.clone(),
                team_name: snapshot.team_short_name(player.team_id).to_string(),
                position: player.position,
                price: player.price,
                total_points: player.total_points,
                owners,
                captain_count: captains,
                vice_captain_count: vices,
                league_ownership_percent: league_pct,
                global_ownership_percent: player.ownership_percent,
                differential_score: player.ownership_percent / league_pct.max(1.0),
            })
        })
        .collect();
    sort_ranked(&mut rows);
    rows
}

pub fn league_differentials(rows: &[LeagueOwnershipRow], params: &LeagueParams) -> Vec<LeagueOwnershipRow> {
    let picked = rows
        .iter()
        .filter(|r| {
            r.league_ownership_percent < params.differential_max_league_ownership
                && r.global_ownership_percent > params.differential_min_global_ownership
        })
        .cloned()
        .collect();
    top_n(picked, params.list)
}

fn by_count_then_points(a_count: f64, b_count: f64, a: &LeagueOwnershipRow, b: &LeagueOwnershipRow) -> Ordering {
    b_count
        .total_cmp(&a_count)
        .then_with(|| b.total_points.cmp(&a.total_points))
        .then_with(|| a.id.cmp(&b.id))
}

/// Template players: owned by more than `highly_owned_above` percent.
pub fn highly_owned(rows: &[LeagueOwnershipRow], params: &LeagueParams) -> Vec<LeagueOwnershipRow> {
    let mut picked: Vec<LeagueOwnershipRow> = rows
        .iter()
        .filter(|r| r.league_ownership_percent > params.highly_owned_above)
        .cloned()
        .collect();
    picked.sort_by(|a, b| {
        by_count_then_points(a.league_ownership_percent, b.league_ownership_percent, a, b)
    });
    picked.truncate(params.list);
    picked
}

pub fn captain_picks(rows: &[LeagueOwnershipRow], limit: usize) -> Vec<LeagueOwnershipRow> {
    let mut picked: Vec<LeagueOwnershipRow> =
        rows.iter().filter(|r| r.captain_count > 0).cloned().collect();
    picked.sort_by(|a, b| by_count_then_points(a.captain_count as f64, b.captain_count as f64, a, b));
    picked.truncate(limit);
    picked
}

/// `None` when the manager is not in the league or has no fetched squad.
pub fn recommendations(
    league: &MiniLeague,
    rows: &[LeagueOwnershipRow],
    manager_id: u32,
    params: &LeagueParams,
) -> Option<LeagueRecommendations> {
    let squad = league.manager(manager_id)?.squad.as_ref()?;
    let owned: HashSet<u32> = squad.picks.iter().map(|p| p.element).collect();

    let targets = rows
        .iter()
        .filter(|r| !owned.contains(&r.id))
        .filter(|r| {
            r.league_ownership_percent < params.target_max_league_ownership
                && r.global_ownership_percent > params.target_min_global_ownership
                && r.total_points > params.target_min_total_points
        })
        .take(params.list)
        .cloned()
        .collect();
    let must_haves = rows
        .iter()
        .filter(|r| !owned.contains(&r.id) && r.league_ownership_percent > params.must_have_above)
        .take(params.must_have_limit)
        .cloned()
        .collect();
    let unique = rows
        .iter()
        .filter(|r| owned.contains(&r.id) && r.league_ownership_percent < params.unique_below)
        .cloned()
        .collect();

    Some(LeagueRecommendations {
        manager_id,
        targets,
        must_haves,
        unique,
    })
}

fn squad_names(manager: &LeagueManager, snapshot: &Snapshot) -> Vec<(u32, String)> {
    manager
        .squad
        .iter()
        .flat_map(|s| s.picks.iter())
        .filter_map(|pick| snapshot.player(pick.element).map(|p| (p.id, p.web_name.clone())))
        .collect()
}

/// `None` unless both managers are in the league.
pub fn head_to_head(
    league: &MiniLeague,
    snapshot: &Snapshot,
    first_id: u32,
    second_id: u32,
) -> Option<HeadToHead> {
    let first = league.manager(first_id)?;
    let second = league.manager(second_id)?;

    let events: BTreeSet<u32> = first
        .history
        .iter()
        .chain(second.history.iter())
        .map(|h| h.event)
        .collect();
    let progression = events
        .into_iter()
        .map(|event| {
            let a = first.history.iter().find(|h| h.event == event);
            let b = second.history.iter().find(|h| h.event == event);
            HeadToHeadGameweek {
                event,
                first_points: a.map(|h| h.points),
                second_points: b.map(|h| h.points),
                first_total: a.map(|h| h.total_points),
                second_total: b.map(|h| h.total_points),
            }
        })
        .collect();

    let first_squad = squad_names(first, snapshot);
    let second_squad = squad_names(second, snapshot);
    let first_ids: HashSet<u32> = first_squad.iter().map(|(id, _)| *id).collect();
    let second_ids: HashSet<u32> = second_squad.iter().map(|(id, _)| *id).collect();
    let shared_players = first_squad
        .iter()
        .filter(|(id, _)| second_ids.contains(id))
        .map(|(_, name)| name.clone())
        .collect();
    let only_first = first_squad
        .iter()
        .filter(|(id, _)| !second_ids.contains(id))
        .map(|(_, name)| name.clone())
        .collect();
    let only_second = second_squad
        .into_iter()
        .filter(|(id, _)| !first_ids.contains(id))
        .map(|(_, name)| name)
        .collect();

    let first = manager_performance(first);
    let second = manager_performance(second);
    Some(HeadToHead {
        points_gap: first.total_points - second.total_points,
        first,
        second,
        progression,
        shared_players,
        only_first,
        only_second,
    })
}
