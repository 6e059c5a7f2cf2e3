use std::cmp::Ordering;

use serde::Serialize;

use crate::config::{DifferentialParams, EmergenceParams, ScoringConfig, TopPlayerParams};
use crate::metrics::{
    self, PlayerRates, TeamRates, differential_score, emergence_score, replacement_score,
    top_player_score,
};
use crate::model::{Availability, Player, Position, Snapshot};

/// Anything ordered by the shared ranking rule: score descending, then total
/// points descending, then id ascending.
pub trait Ranked {
    fn rank_score(&self) -> f64;
    fn rank_points(&self) -> i32;
    fn rank_id(&self) -> u32;
}

pub fn rank_order<T: Ranked>(a: &T, b: &T) -> Ordering {
    b.rank_score()
        .total_cmp(&a.rank_score())
        .then_with(|| b.rank_points().cmp(&a.rank_points()))
        .then_with(|| a.rank_id().cmp(&b.rank_id()))
}

pub fn sort_ranked<T: Ranked>(rows: &mut [T]) {
    rows.sort_by(rank_order);
}

/// Orders `rows` and keeps the first `limit`. Fewer rows than `limit` is fine.
pub fn top_n<T: Ranked>(mut rows: Vec<T>, limit: usize) -> Vec<T> {
    sort_ranked(&mut rows);
    rows.truncate(limit);
    rows
}

macro_rules! impl_ranked {
    ($ty:ty, $score:ident) => {
        impl Ranked for $ty {
            fn rank_score(&self) -> f64 {
                self.$score
            }
            fn rank_points(&self) -> i32 {
                self.total_points
            }
            fn rank_id(&self) -> u32 {
                self.id
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialRow {
    pub id: u32,
    pub web_name: String,
    pub team_name: String,
    pub position: Position,
    pub price: f64,
    pub total_points: i32,
    pub form: f64,
    pub points_per_90: f64,
    pub xgi_per_90: f64,
    pub ownership_percent: f64,
    pub differential_score: f64,
}
impl_ranked!(DifferentialRow, differential_score);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergingRow {
    pub id: u32,
    pub web_name: String,
    pub team_name: String,
    pub position: Position,
    pub price: f64,
    pub total_points: i32,
    pub form: f64,
    pub points_per_90: f64,
    pub minutes_per_gameweek: f64,
    pub ownership_percent: f64,
    pub emergence_score: f64,
}
impl_ranked!(EmergingRow, emergence_score);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRow {
    pub id: u32,
    pub web_name: String,
    pub team_name: String,
    pub position: Position,
    pub price: f64,
    pub total_points: i32,
    pub form: f64,
    pub points_per_game: f64,
    pub ownership_percent: f64,
    pub value_score: f64,
}
impl_ranked!(ValueRow, value_score);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPlayerRow {
    pub id: u32,
    pub web_name: String,
    pub team_name: String,
    pub price: f64,
    pub total_points: i32,
    pub form: f64,
    pub points_per_game: f64,
    pub ownership_percent: f64,
    pub score: f64,
}
impl_ranked!(TopPlayerRow, score);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementRow {
    pub id: u32,
    pub web_name: String,
    pub team_name: String,
    pub price: f64,
    pub form: f64,
    pub points_per_game: f64,
    pub total_points: i32,
    pub ownership_percent: f64,
    pub replacement_score: f64,
}
impl_ranked!(ReplacementRow, replacement_score);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerShotsRow {
    pub id: u32,
    pub web_name: String,
    pub team_name: String,
    pub position: Position,
    pub price: f64,
    pub shots_per_90: f64,
    pub shots_on_target_per_90: f64,
    pub xg_per_90: f64,
    pub goals_scored: u32,
    pub total_points: i32,
}
impl_ranked!(PlayerShotsRow, shots_per_90);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionShotsRow {
    pub position: Position,
    pub avg_shots_per_90: f64,
    pub avg_shots_on_target_per_90: f64,
    pub avg_xg_per_90: f64,
    pub total_shots: f64,
    pub total_goals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamShotsRow {
    pub team_id: u32,
    pub team_name: String,
    pub shots_per_match: f64,
    pub shots_on_target_per_match: f64,
    pub xg_per_match: f64,
    pub goals_scored: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamReliabilityRow {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    pub matches_played: u32,
    #[serde(flatten)]
    pub rates: TeamRates,
}

pub fn is_differential_eligible(
    player: &Player,
    rates: &PlayerRates,
    gameweeks_played: u32,
    params: &DifferentialParams,
) -> bool {
    let regular_minutes = gameweeks_played as f64 * params.min_minutes_per_gameweek;
    (!params.outfield_only || player.position != Position::Goalkeeper)
        && player.minutes > 0
        && player.minutes as f64 > regular_minutes
        && player.ownership_percent < params.max_ownership
        && rates.points_per_90 >= params.min_points_per_90
        && player.form >= params.min_form
}

pub fn is_emerging_eligible(player: &Player, rates: &PlayerRates, params: &EmergenceParams) -> bool {
    (!params.outfield_only || player.position != Position::Goalkeeper)
        && player.minutes > 0
        && player.starts >= params.min_starts
        && player.form >= params.min_form
        && player.ownership_percent < params.max_ownership
        && rates.minutes_per_gameweek >= params.min_minutes_per_gameweek
        && player.total_points >= params.min_total_points
        && rates.points_per_90 >= params.min_points_per_90
}

pub fn is_top_player_eligible(player: &Player, gameweeks_played: u32, params: &TopPlayerParams) -> bool {
    player.minutes as f64 >= gameweeks_played as f64 * params.min_minutes_per_gameweek
}

pub fn is_replacement_candidate(candidate: &Player, outgoing: &Player, max_price: f64) -> bool {
    candidate.position == outgoing.position
        && candidate.id != outgoing.id
        && candidate.price <= max_price
        && candidate.availability == Availability::Available
        && candidate.minutes > 0
}

pub fn differentials(snapshot: &Snapshot, config: &ScoringConfig, limit: usize) -> Vec<DifferentialRow> {
    let gw = snapshot.gameweeks.played;
    let params = &config.differential;
    let rows = snapshot
        .players
        .iter()
        .filter_map(|player| {
            let rates = PlayerRates::derive(player, gw);
            if !is_differential_eligible(player, &rates, gw, params) {
                return None;
            }
            Some(DifferentialRow {
                id: player.id,
                web_name: player.web_name.clone(),
                team_name: snapshot.team_name(player.team_id).to_string(),
                position: player.position,
                price: player.price,
                total_points: player.total_points,
                form: player.form,
                points_per_90: rates.points_per_90,
                xgi_per_90: rates.xgi_per_90,
                ownership_percent: player.ownership_percent,
                differential_score: differential_score(
                    rates.points_per_90,
                    rates.xgi_per_90,
                    player.form,
                    player.ownership_percent,
                    params,
                ),
            })
        })
        .collect();
    top_n(rows, limit)
}

pub fn emerging(snapshot: &Snapshot, config: &ScoringConfig, limit: usize) -> Vec<EmergingRow> {
    let gw = snapshot.gameweeks.played;
    let params = &config.emergence;
    let rows = snapshot
        .players
        .iter()
        .filter_map(|player| {
            let rates = PlayerRates::derive(player, gw);
            if !is_emerging_eligible(player, &rates, params) {
                return None;
            }
            Some(EmergingRow {
                id: player.id,
                web_name: player.web_name.clone(),
                team_name: snapshot.team_name(player.team_id).to_string(),
                position: player.position,
                price: player.price,
                total_points: player.total_points,
                form: player.form,
                points_per_90: rates.points_per_90,
                minutes_per_gameweek: rates.minutes_per_gameweek,
                ownership_percent: player.ownership_percent,
                emergence_score: emergence_score(player, &rates, params),
            })
        })
        .collect();
    top_n(rows, limit)
}

pub fn value_rows(
    snapshot: &Snapshot,
    config: &ScoringConfig,
    position: Option<Position>,
) -> Vec<ValueRow> {
    let mut rows: Vec<ValueRow> = snapshot
        .players
        .iter()
        .filter(|p| position.is_none_or(|pos| p.position == pos))
        .filter_map(|player| {
            let value_score = metrics::value_score(player, &config.value)?;
            Some(ValueRow {
                id: player.id,
                web_name: player.web_name.clone(),
                team_name: snapshot.team_name(player.team_id).to_string(),
                position: player.position,
                price: player.price,
                total_points: player.total_points,
                form: player.form,
                points_per_game: player.points_per_game,
                ownership_percent: player.ownership_percent,
                value_score,
            })
        })
        .collect();
    sort_ranked(&mut rows);
    rows
}

pub fn top_players_for_position(
    snapshot: &Snapshot,
    config: &ScoringConfig,
    position: Position,
    limit: usize,
) -> Vec<TopPlayerRow> {
    let gw = snapshot.gameweeks.played;
    let params = &config.top_players;
    let rows = snapshot
        .players
        .iter()
        .filter(|p| p.position == position)
        .filter(|p| is_top_player_eligible(p, gw, params))
        .map(|player| TopPlayerRow {
            id: player.id,
            web_name: player.web_name.clone(),
            team_name: snapshot.team_name(player.team_id).to_string(),
            price: player.price,
            total_points: player.total_points,
            form: player.form,
            points_per_game: player.points_per_game,
            ownership_percent: player.ownership_percent,
            score: top_player_score(player, params),
        })
        .collect();
    top_n(rows, limit)
}

pub fn replacements_for(
    snapshot: &Snapshot,
    config: &ScoringConfig,
    outgoing: &Player,
    max_price: f64,
    limit: usize,
) -> Vec<ReplacementRow> {
    let rows = snapshot
        .players
        .iter()
        .filter(|c| is_replacement_candidate(c, outgoing, max_price))
        .map(|c| ReplacementRow {
            id: c.id,
            web_name: c.web_name.clone(),
            team_name: snapshot.team_name(c.team_id).to_string(),
            price: c.price,
            form: c.form,
            points_per_game: c.points_per_game,
            total_points: c.total_points,
            ownership_percent: c.ownership_percent,
            replacement_score: replacement_score(c, outgoing.price, &config.replacement),
        })
        .collect();
    top_n(rows, limit)
}

pub struct ShotsBreakdown {
    pub by_player: Vec<PlayerShotsRow>,
    pub by_position: Vec<PositionShotsRow>,
    pub by_team: Vec<TeamShotsRow>,
}

pub fn shots_breakdown(snapshot: &Snapshot, config: &ScoringConfig) -> ShotsBreakdown {
    let gw = snapshot.gameweeks.played;
    let params = &config.shots;
    let active: Vec<(&Player, PlayerRates)> = snapshot
        .players
        .iter()
        .filter(|p| p.position != Position::Goalkeeper && p.minutes >= params.min_minutes)
        .map(|p| (p, PlayerRates::derive(p, gw)))
        .collect();

    let by_player_rows = active
        .iter()
        .filter(|(p, _)| p.shots > params.min_estimated_shots)
        .map(|(p, rates)| PlayerShotsRow {
            id: p.id,
            web_name: p.web_name.clone(),
            team_name: snapshot.team_name(p.team_id).to_string(),
            position: p.position,
            price: p.price,
            shots_per_90: rates.shots_per_90,
            shots_on_target_per_90: rates.shots_on_target_per_90,
            xg_per_90: rates.xg_per_90,
            goals_scored: p.goals_scored,
            total_points: p.total_points,
        })
        .collect();
    let by_player = top_n(by_player_rows, config.limits.shots_players);

    let by_position = Position::OUTFIELD
        .iter()
        .filter_map(|pos| {
            let group: Vec<&(&Player, PlayerRates)> =
                active.iter().filter(|(p, _)| p.position == *pos).collect();
            if group.is_empty() {
                return None;
            }
            let n = group.len() as f64;
            Some(PositionShotsRow {
                position: *pos,
                avg_shots_per_90: group.iter().map(|(_, r)| r.shots_per_90).sum::<f64>() / n,
                avg_shots_on_target_per_90: group
                    .iter()
                    .map(|(_, r)| r.shots_on_target_per_90)
                    .sum::<f64>()
                    / n,
                avg_xg_per_90: group.iter().map(|(_, r)| r.xg_per_90).sum::<f64>() / n,
                total_shots: group.iter().map(|(p, _)| p.shots).sum(),
                total_goals: group.iter().map(|(p, _)| p.goals_scored).sum(),
            })
        })
        .collect();

    let mut by_team: Vec<TeamShotsRow> = snapshot
        .teams
        .iter()
        .filter_map(|team| {
            let members: Vec<&Player> = active
                .iter()
                .filter(|(p, _)| p.team_id == team.id)
                .map(|(p, _)| *p)
                .collect();
            if members.is_empty() {
                return None;
            }
            let shots: f64 = members.iter().map(|p| p.shots).sum();
            let on_target: f64 = members.iter().map(|p| p.shots_on_target).sum();
            let xg: f64 = members.iter().map(|p| p.expected_goals).sum();
            Some(TeamShotsRow {
                team_id: team.id,
                team_name: team.name.clone(),
                shots_per_match: metrics::per_match(shots, gw),
                shots_on_target_per_match: metrics::per_match(on_target, gw),
                xg_per_match: metrics::per_match(xg, gw),
                goals_scored: members.iter().map(|p| p.goals_scored).sum(),
            })
        })
        .collect();
    by_team.sort_by(|a, b| {
        b.shots_per_match
            .total_cmp(&a.shots_per_match)
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    by_team.truncate(config.limits.shots_teams);

    ShotsBreakdown {
        by_player,
        by_position,
        by_team,
    }
}

pub fn team_reliability_rows(snapshot: &Snapshot) -> Vec<TeamReliabilityRow> {
    snapshot
        .teams
        .iter()
        .map(|team| TeamReliabilityRow {
            id: team.id,
            name: team.name.clone(),
            short_name: team.short_name.clone(),
            matches_played: team.matches_played,
            rates: TeamRates::derive(team),
        })
        .collect()
}

/// Lowest xGA per match first. Teams without a finished match are left out.
pub fn best_defense(mut rows: Vec<TeamReliabilityRow>) -> Vec<TeamReliabilityRow> {
    rows.retain(|row| row.matches_played > 0);
    rows.sort_by(|a, b| {
        a.rates
            .xga_per_90
            .total_cmp(&b.rates.xga_per_90)
            .then_with(|| a.id.cmp(&b.id))
    });
    rows
}

/// Highest xG per match first. Teams without a finished match are left out.
pub fn best_attack(mut rows: Vec<TeamReliabilityRow>) -> Vec<TeamReliabilityRow> {
    rows.retain(|row| row.matches_played > 0);
    rows.sort_by(|a, b| {
        b.rates
            .xg_per_90
            .total_cmp(&a.rates.xg_per_90)
            .then_with(|| a.id.cmp(&b.id))
    });
    rows
}
