use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::{AppConfig, ScoringConfig};
use crate::fpl_fetch::{fetch_manager_squad, fetch_mini_league, fetch_snapshot};
use crate::http_cache::HttpStatusError;
use crate::metrics::{self, PlayerRates};
use crate::mini_league::{
    self, HeadToHead, LeagueOwnershipRow, LeagueRecommendations, ManagerPerformance,
};
use crate::model::{GameweekInfo, MiniLeague, Player, Position, Snapshot};
use crate::rankings::{
    self, DifferentialRow, EmergingRow, PlayerShotsRow, PositionShotsRow, Ranked, ReplacementRow,
    TeamReliabilityRow, TeamShotsRow, TopPlayerRow, ValueRow, top_n,
};
use crate::team_review::{SquadReview, review_squad};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Network, provider or parse failure. No partial data is returned.
    #[error("upstream fetch failed: {0:#}")]
    Upstream(anyhow::Error),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u32 },
    #[error("season has no current or upcoming gameweek")]
    NoGameweek,
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Upstream(err)
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<HttpStatusError>()
            .is_some_and(HttpStatusError::is_not_found)
    })
}

/// A provider 404 anywhere in the chain means the requested `kind` does not
/// exist; anything else is an upstream failure.
pub fn classify_fetch_error(err: anyhow::Error, kind: &'static str, id: u32) -> ApiError {
    if is_not_found(&err) {
        ApiError::NotFound { kind, id }
    } else {
        ApiError::Upstream(err)
    }
}

pub fn initialize(config: &AppConfig, scoring: &ScoringConfig) -> Result<Arc<Snapshot>, ApiError> {
    let snapshot = fetch_snapshot(config, &scoring.shots)?;
    Ok(Arc::new(snapshot))
}

#[derive(Debug, Clone, Serialize)]
pub struct InitSummary {
    pub fetched_at: DateTime<Utc>,
    pub players: usize,
    pub teams: usize,
    pub gameweeks: GameweekInfo,
    pub skipped_records: usize,
}

pub fn init_summary(snapshot: &Snapshot) -> InitSummary {
    InitSummary {
        fetched_at: snapshot.fetched_at,
        players: snapshot.players.len(),
        teams: snapshot.teams.len(),
        gameweeks: snapshot.gameweeks,
        skipped_records: snapshot.skipped_records,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamReliabilityView {
    pub gameweeks_played: u32,
    pub teams: Vec<TeamReliabilityRow>,
    pub best_defense: Vec<TeamReliabilityRow>,
    pub best_attack: Vec<TeamReliabilityRow>,
}

pub fn team_reliability(snapshot: &Snapshot, scoring: &ScoringConfig) -> TeamReliabilityView {
    let teams = rankings::team_reliability_rows(snapshot);
    let mut best_defense = rankings::best_defense(teams.clone());
    best_defense.truncate(scoring.limits.chart);
    let mut best_attack = rankings::best_attack(teams.clone());
    best_attack.truncate(scoring.limits.chart);
    TeamReliabilityView {
        gameweeks_played: snapshot.gameweeks.played,
        teams,
        best_defense,
        best_attack,
    }
}

/// A ranked player list. An empty list is a valid answer.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerListView<T> {
    pub gameweeks_played: u32,
    pub count: usize,
    pub players: Vec<T>,
}

impl<T> PlayerListView<T> {
    fn new(snapshot: &Snapshot, players: Vec<T>) -> Self {
        Self {
            gameweeks_played: snapshot.gameweeks.played,
            count: players.len(),
            players,
        }
    }
}

pub fn differentials(
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
    limit: Option<usize>,
) -> PlayerListView<DifferentialRow> {
    let limit = limit.unwrap_or(scoring.limits.list);
    PlayerListView::new(snapshot, rankings::differentials(snapshot, scoring, limit))
}

pub fn emerging(
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
    limit: Option<usize>,
) -> PlayerListView<EmergingRow> {
    let limit = limit.unwrap_or(scoring.limits.list);
    PlayerListView::new(snapshot, rankings::emerging(snapshot, scoring, limit))
}

#[derive(Debug, Clone, Serialize)]
pub struct ShotsView {
    pub gameweeks_played: u32,
    pub players: Vec<PlayerShotsRow>,
    pub positions: Vec<PositionShotsRow>,
    pub teams: Vec<TeamShotsRow>,
}

pub fn shots(snapshot: &Snapshot, scoring: &ScoringConfig) -> ShotsView {
    let breakdown = rankings::shots_breakdown(snapshot, scoring);
    ShotsView {
        gameweeks_played: snapshot.gameweeks.played,
        players: breakdown.by_player,
        positions: breakdown.by_position,
        teams: breakdown.by_team,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionGroup {
    pub position: Position,
    pub players: Vec<TopPlayerRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopPlayersView {
    pub gameweeks_played: u32,
    pub positions: Vec<PositionGroup>,
}

pub fn top_players(snapshot: &Snapshot, scoring: &ScoringConfig, limit: Option<usize>) -> TopPlayersView {
    let limit = limit.unwrap_or(scoring.limits.chart);
    let positions = Position::ALL
        .iter()
        .map(|pos| PositionGroup {
            position: *pos,
            players: rankings::top_players_for_position(snapshot, scoring, *pos, limit),
        })
        .collect();
    TopPlayersView {
        gameweeks_played: snapshot.gameweeks.played,
        positions,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValueView {
    pub position: Option<Position>,
    pub count: usize,
    pub players: Vec<ValueRow>,
}

pub fn value(
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
    position: Option<Position>,
    limit: Option<usize>,
) -> ValueView {
    let mut players = rankings::value_rows(snapshot, scoring, position);
    players.truncate(limit.unwrap_or(scoring.limits.chart));
    ValueView {
        position,
        count: players.len(),
        players,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SortKey {
    #[default]
    ValueScore,
    TotalPoints,
    Form,
    PointsPerGame,
    Price,
    Ownership,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::ValueScore,
        SortKey::TotalPoints,
        SortKey::Form,
        SortKey::PointsPerGame,
        SortKey::Price,
        SortKey::Ownership,
    ];

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "value" | "value_score" => Some(SortKey::ValueScore),
            "points" | "total_points" => Some(SortKey::TotalPoints),
            "form" => Some(SortKey::Form),
            "ppg" | "points_per_game" => Some(SortKey::PointsPerGame),
            "price" => Some(SortKey::Price),
            "ownership" | "selected_by" => Some(SortKey::Ownership),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::ValueScore => "value",
            SortKey::TotalPoints => "points",
            SortKey::Form => "form",
            SortKey::PointsPerGame => "ppg",
            SortKey::Price => "price",
            SortKey::Ownership => "ownership",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Case-insensitive substring of the web name or team name.
    pub text: String,
    pub position: Option<Position>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: SortKey,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRow {
    pub id: u32,
    pub web_name: String,
    pub team_name: String,
    pub position: Position,
    pub price: f64,
    pub total_points: i32,
    pub form: f64,
    pub points_per_game: f64,
    pub ownership_percent: f64,
    pub value_score: Option<f64>,
    #[serde(skip)]
    sort_value: f64,
}

impl Ranked for SearchRow {
    fn rank_score(&self) -> f64 {
        self.sort_value
    }
    fn rank_points(&self) -> i32 {
        self.total_points
    }
    fn rank_id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub sort: SortKey,
    pub count: usize,
    pub players: Vec<SearchRow>,
}

pub fn search(snapshot: &Snapshot, scoring: &ScoringConfig, query: &SearchQuery) -> SearchResults {
    let needle = query.text.trim().to_lowercase();
    let rows = snapshot
        .players
        .iter()
        .filter(|p| query.position.is_none_or(|pos| p.position == pos))
        .filter(|p| query.min_price.is_none_or(|min| p.price >= min))
        .filter(|p| query.max_price.is_none_or(|max| p.price <= max))
        .filter(|p| {
            needle.is_empty()
                || p.web_name.to_lowercase().contains(&needle)
                || snapshot.team_name(p.team_id).to_lowercase().contains(&needle)
        })
        .map(|p| {
            let value_score = metrics::value_score(p, &scoring.value);
            let sort_value = match query.sort {
                // Players without a value score sink to the bottom.
                SortKey::ValueScore => value_score.unwrap_or(f64::NEG_INFINITY),
                SortKey::TotalPoints => p.total_points as f64,
                SortKey::Form => p.form,
                SortKey::PointsPerGame => p.points_per_game,
                SortKey::Price => p.price,
                SortKey::Ownership => p.ownership_percent,
            };
            SearchRow {
                id: p.id,
                web_name: p.web_name.clone(),
                team_name: snapshot.team_name(p.team_id).to_string(),
                position: p.position,
                price: p.price,
                total_points: p.total_points,
                form: p.form,
                points_per_game: p.points_per_game,
                ownership_percent: p.ownership_percent,
                value_score,
                sort_value,
            }
        })
        .collect();
    let players = top_n(rows, query.limit.unwrap_or(scoring.limits.search));
    SearchResults {
        sort: query.sort,
        count: players.len(),
        players,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerDetailView {
    pub player: Player,
    pub team_name: String,
    pub availability: &'static str,
    pub rates: PlayerRates,
    pub value_score: Option<f64>,
    pub last_gameweek_minutes: Option<u32>,
}

pub fn player_detail(
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
    player_id: u32,
) -> Result<PlayerDetailView, ApiError> {
    let player = snapshot.player(player_id).ok_or(ApiError::NotFound {
        kind: "player",
        id: player_id,
    })?;
    Ok(PlayerDetailView {
        team_name: snapshot.team_name(player.team_id).to_string(),
        availability: player.availability.label(),
        rates: PlayerRates::derive(player, snapshot.gameweeks.played),
        value_score: metrics::value_score(player, &scoring.value),
        last_gameweek_minutes: snapshot.last_gameweek_minutes_for(player.id),
        player: player.clone(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplacementView {
    pub outgoing_id: u32,
    pub outgoing_name: String,
    pub position: Position,
    pub outgoing_price: f64,
    pub max_price: f64,
    pub count: usize,
    pub candidates: Vec<ReplacementRow>,
}

/// `max_price` defaults to the outgoing price plus the configured headroom.
pub fn replacements(
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
    player_id: u32,
    max_price: Option<f64>,
    limit: Option<usize>,
) -> Result<ReplacementView, ApiError> {
    let outgoing = snapshot.player(player_id).ok_or(ApiError::NotFound {
        kind: "player",
        id: player_id,
    })?;
    let max_price =
        max_price.unwrap_or(outgoing.price + scoring.replacement.default_budget_headroom);
    let limit = limit.unwrap_or(scoring.limits.replacements);
    let candidates = rankings::replacements_for(snapshot, scoring, outgoing, max_price, limit);
    Ok(ReplacementView {
        outgoing_id: outgoing.id,
        outgoing_name: outgoing.web_name.clone(),
        position: outgoing.position,
        outgoing_price: outgoing.price,
        max_price,
        count: candidates.len(),
        candidates,
    })
}

/// One GET for the manager's picks; everything else comes from the snapshot.
pub fn team_review(
    config: &AppConfig,
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
    manager_id: u32,
) -> Result<SquadReview, ApiError> {
    let gameweek = snapshot.gameweeks.current.ok_or(ApiError::NoGameweek)?;
    let squad = fetch_manager_squad(config, manager_id, gameweek)
        .map_err(|err| classify_fetch_error(err, "manager", manager_id))?;
    if squad.picks.is_empty() {
        return Err(ApiError::NotFound {
            kind: "squad",
            id: manager_id,
        });
    }
    Ok(review_squad(snapshot, &squad, &scoring.issues))
}

/// Standings plus each top manager's squad and history for the current
/// gameweek.
pub fn mini_league(
    config: &AppConfig,
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
    league_id: u32,
) -> Result<MiniLeague, ApiError> {
    let gameweek = snapshot.gameweeks.current.ok_or(ApiError::NoGameweek)?;
    fetch_mini_league(config, league_id, gameweek, scoring.league.max_managers)
        .map_err(|err| classify_fetch_error(err, "league", league_id))
}

#[derive(Debug, Clone, Serialize)]
pub struct MiniLeagueView {
    pub league_id: u32,
    pub name: String,
    pub gameweek: u32,
    pub managers: usize,
    pub squads_fetched: usize,
    pub failed_managers: Vec<u32>,
    pub standings: Vec<ManagerPerformance>,
    pub differentials: Vec<LeagueOwnershipRow>,
    pub highly_owned: Vec<LeagueOwnershipRow>,
    pub captains: Vec<LeagueOwnershipRow>,
}

pub fn mini_league_view(snapshot: &Snapshot, scoring: &ScoringConfig, league: &MiniLeague) -> MiniLeagueView {
    let params = &scoring.league;
    let ownership = mini_league::league_ownership(league, snapshot);
    MiniLeagueView {
        league_id: league.league_id,
        name: league.name.clone(),
        gameweek: league.gameweek,
        managers: league.managers.len(),
        squads_fetched: league.managers.iter().filter(|m| m.squad.is_some()).count(),
        failed_managers: league.failed_managers.clone(),
        standings: mini_league::league_performance(league),
        differentials: mini_league::league_differentials(&ownership, params),
        highly_owned: mini_league::highly_owned(&ownership, params),
        captains: mini_league::captain_picks(&ownership, params.list),
    }
}

pub fn head_to_head(
    snapshot: &Snapshot,
    league: &MiniLeague,
    first_id: u32,
    second_id: u32,
) -> Result<HeadToHead, ApiError> {
    for id in [first_id, second_id] {
        if league.manager(id).is_none() {
            return Err(ApiError::NotFound { kind: "manager", id });
        }
    }
    mini_league::head_to_head(league, snapshot, first_id, second_id).ok_or(ApiError::NotFound {
        kind: "manager",
        id: first_id,
    })
}

pub fn league_recommendations(
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
    league: &MiniLeague,
    manager_id: u32,
) -> Result<LeagueRecommendations, ApiError> {
    let manager = league.manager(manager_id).ok_or(ApiError::NotFound {
        kind: "manager",
        id: manager_id,
    })?;
    if manager.squad.is_none() {
        return Err(ApiError::NotFound {
            kind: "squad",
            id: manager_id,
        });
    }
    let ownership = mini_league::league_ownership(league, snapshot);
    mini_league::recommendations(league, &ownership, manager_id, &scoring.league).ok_or(
        ApiError::NotFound {
            kind: "squad",
            id: manager_id,
        },
    )
}
