use std::collections::HashMap;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::{AppConfig, ShotParams};
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::metrics::aggregate_team_totals;
use crate::model::{
    Availability, Fixture, GameweekHistory, GameweekInfo, LeagueManager, LeagueStanding,
    LeagueStandings, ManagerSquad, MiniLeague, Player, Position, Snapshot, SquadPick, Team,
};

#[derive(Debug, Clone)]
pub struct BootstrapData {
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
    pub gameweeks: GameweekInfo,
    pub skipped_records: usize,
}

/// Fetches bootstrap data, then fixtures and the latest live gameweek in
/// parallel, and folds everything into one immutable snapshot.
pub fn fetch_snapshot(config: &AppConfig, shots: &ShotParams) -> Result<Snapshot> {
    let bootstrap = fetch_bootstrap(config, shots)?;
    let latest = bootstrap.gameweeks.latest_finished;
    let (fixtures, live) = rayon::join(
        || fetch_fixtures(config),
        || latest.map(|gw| fetch_event_live_minutes(config, gw)).transpose(),
    );
    let fixtures = fixtures?;
    let live = live?;
    Ok(build_snapshot(bootstrap, &fixtures, live))
}

pub fn fetch_bootstrap(config: &AppConfig, shots: &ShotParams) -> Result<BootstrapData> {
    let body = get(config, "bootstrap-static/").context("bootstrap fetch failed")?;
    parse_bootstrap_json(&body, shots)
}

pub fn fetch_fixtures(config: &AppConfig) -> Result<Vec<Fixture>> {
    let body = get(config, "fixtures/").context("fixtures fetch failed")?;
    parse_fixtures_json(&body)
}

pub fn fetch_event_live_minutes(config: &AppConfig, gameweek: u32) -> Result<HashMap<u32, u32>> {
    let body = get(config, &format!("event/{gameweek}/live/"))
        .with_context(|| format!("live gameweek {gameweek} fetch failed"))?;
    parse_event_live_json(&body)
}

/// A 404 from the provider stays visible as `HttpStatusError` in the chain.
pub fn fetch_manager_squad(config: &AppConfig, manager_id: u32, gameweek: u32) -> Result<ManagerSquad> {
    let body = get(config, &format!("entry/{manager_id}/event/{gameweek}/picks/"))
        .with_context(|| format!("picks fetch failed for manager {manager_id}"))?;
    parse_picks_json(&body, manager_id, gameweek)
}

/// First standings page only; a 404 stays visible in the chain.
pub fn fetch_league_standings(config: &AppConfig, league_id: u32) -> Result<LeagueStandings> {
    let body = get(
        config,
        &format!("leagues-classic/{league_id}/standings/?page_standings=1"),
    )
    .with_context(|| format!("league standings fetch failed for league {league_id}"))?;
    parse_league_standings_json(&body, league_id)
}

pub fn fetch_manager_history(config: &AppConfig, manager_id: u32) -> Result<Vec<GameweekHistory>> {
    let body = get(config, &format!("entry/{manager_id}/history/"))
        .with_context(|| format!("history fetch failed for manager {manager_id}"))?;
    parse_manager_history_json(&body)
}

/// Fetches the standings, then the squad and history of the top
/// `max_managers` entries in parallel. A manager whose squad or history
/// cannot be fetched stays in the league with what did arrive and is listed
/// in `failed_managers`.
pub fn fetch_mini_league(
    config: &AppConfig,
    league_id: u32,
    gameweek: u32,
    max_managers: usize,
) -> Result<MiniLeague> {
    let mut standings = fetch_league_standings(config, league_id)?;
    let mut entries = std::mem::take(&mut standings.standings);
    entries.truncate(max_managers);
    let fetched: Vec<(LeagueManager, bool)> = entries
        .into_par_iter()
        .map(|standing| {
            let id = standing.manager_id;
            let (squad, history) = rayon::join(
                || fetch_manager_squad(config, id, gameweek),
                || fetch_manager_history(config, id),
            );
            let failed = squad.is_err() || history.is_err();
            let manager = LeagueManager {
                standing,
                squad: squad.ok(),
                history: history.unwrap_or_default(),
            };
            (manager, failed)
        })
        .collect();

    let failed_managers = fetched
        .iter()
        .filter(|(_, failed)| *failed)
        .map(|(m, _)| m.standing.manager_id)
        .collect();
    Ok(MiniLeague {
        league_id: standings.league_id,
        name: standings.name,
        gameweek,
        managers: fetched.into_iter().map(|(m, _)| m).collect(),
        failed_managers,
    })
}

fn get(config: &AppConfig, path: &str) -> Result<String> {
    let client = http_client(config.http_timeout_secs)?;
    let url = format!("{}/{}", config.api_base.trim_end_matches('/'), path);
    fetch_json_cached(client, &url)
}

pub fn build_snapshot(
    bootstrap: BootstrapData,
    fixtures: &[Fixture],
    last_gameweek_minutes: Option<HashMap<u32, u32>>,
) -> Snapshot {
    let BootstrapData {
        players,
        mut teams,
        gameweeks,
        skipped_records,
    } = bootstrap;
    aggregate_team_totals(&mut teams, &players, fixtures);
    Snapshot::new(players, teams, gameweeks, last_gameweek_minutes, skipped_records)
}

#[derive(Debug, Deserialize)]
struct RawBootstrap {
    #[serde(default)]
    events: Vec<RawEvent>,
    #[serde(default)]
    teams: Vec<Value>,
    #[serde(default)]
    elements: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: u32,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    is_current: bool,
    #[serde(default)]
    is_next: bool,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: u32,
    name: String,
    #[serde(default)]
    short_name: String,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    id: u32,
    web_name: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    second_name: String,
    team: u32,
    element_type: u8,
    now_cost: u32,
    #[serde(default)]
    total_points: i32,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    starts: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    form: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    points_per_game: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    selected_by_percent: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    expected_goals: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    expected_assists: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    expected_goals_conceded: f64,
    #[serde(default)]
    goals_scored: u32,
    #[serde(default)]
    assists: u32,
    #[serde(default)]
    clean_sheets: u32,
    #[serde(default)]
    goals_conceded: u32,
    #[serde(default)]
    saves: u32,
    #[serde(default)]
    bonus: u32,
    #[serde(default)]
    status: String,
    #[serde(default)]
    chance_of_playing_next_round: Option<u8>,
    #[serde(default)]
    news: Option<String>,
}

/// FPL ships most decimals as strings ("4.5"); accept either form and map
/// null or garbage to 0.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value).unwrap_or(0.0))
}

fn value_to_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

pub fn parse_bootstrap_json(raw: &str, shots: &ShotParams) -> Result<BootstrapData> {
    let root: RawBootstrap = serde_json::from_str(raw.trim()).context("invalid bootstrap json")?;

    let mut skipped_records = 0usize;
    let mut teams = Vec::with_capacity(root.teams.len());
    for value in root.teams {
        match serde_json::from_value::<RawTeam>(value) {
            Ok(raw) => teams.push(Team {
                id: raw.id,
                short_name: if raw.short_name.is_empty() {
                    raw.name.clone()
                } else {
                    raw.short_name
                },
                name: raw.name,
                ..Team::default()
            }),
            Err(_) => skipped_records += 1,
        }
    }

    let mut players = Vec::with_capacity(root.elements.len());
    for value in root.elements {
        let Ok(raw) = serde_json::from_value::<RawElement>(value) else {
            skipped_records += 1;
            continue;
        };
        match player_from_raw(raw, shots) {
            Some(player) => players.push(player),
            None => skipped_records += 1,
        }
    }

    Ok(BootstrapData {
        players,
        teams,
        gameweeks: gameweek_info(&root.events),
        skipped_records,
    })
}

fn player_from_raw(raw: RawElement, shots: &ShotParams) -> Option<Player> {
    let position = Position::from_element_type(raw.element_type)?;
    let games_played = derive_games_played(
        raw.total_points,
        raw.points_per_game,
        raw.minutes,
        raw.starts,
    );
    let full_name = format!("{} {}", raw.first_name.trim(), raw.second_name.trim())
        .trim()
        .to_string();
    Some(Player {
        id: raw.id,
        full_name: if full_name.is_empty() {
            raw.web_name.clone()
        } else {
            full_name
        },
        web_name: raw.web_name,
        team_id: raw.team,
        position,
        price: raw.now_cost as f64 / 10.0,
        total_points: raw.total_points,
        games_played,
        starts: raw.starts,
        minutes: raw.minutes,
        form: raw.form,
        points_per_game: raw.points_per_game,
        ownership_percent: raw.selected_by_percent,
        expected_goals: raw.expected_goals,
        expected_assists: raw.expected_assists,
        expected_goals_conceded: raw.expected_goals_conceded,
        shots: raw.expected_goals * shots.shots_per_xg,
        shots_on_target: raw.expected_goals * shots.on_target_per_xg,
        goals_scored: raw.goals_scored,
        assists: raw.assists,
        clean_sheets: raw.clean_sheets,
        goals_conceded: raw.goals_conceded,
        saves: raw.saves,
        bonus: raw.bonus,
        availability: Availability::from_status_code(&raw.status),
        chance_of_playing_next_round: raw.chance_of_playing_next_round,
        news: raw.news.unwrap_or_default().trim().to_string(),
    })
}

/// The provider has no appearances field; recover it from points per game.
pub fn derive_games_played(total_points: i32, points_per_game: f64, minutes: u32, starts: u32) -> u32 {
    if points_per_game > 0.0 && total_points > 0 {
        let games = (total_points as f64 / points_per_game).round();
        if games >= 1.0 {
            return games as u32;
        }
    }
    if minutes > 0 { starts.max(1) } else { 0 }
}

fn gameweek_info(events: &[RawEvent]) -> GameweekInfo {
    let finished: Vec<u32> = events.iter().filter(|e| e.finished).map(|e| e.id).collect();
    let current = events
        .iter()
        .find(|e| e.is_current)
        .or_else(|| events.iter().find(|e| e.is_next))
        .map(|e| e.id);

    let played = if !finished.is_empty() {
        finished.len() as u32
    } else if let Some(gw) = events.iter().find(|e| e.is_current).map(|e| e.id) {
        gw.saturating_sub(1).max(1)
    } else {
        0
    };

    GameweekInfo {
        played,
        current,
        target: played + 1,
        latest_finished: finished.iter().copied().max(),
    }
}

#[derive(Debug, Deserialize)]
struct RawFixture {
    id: u32,
    #[serde(default)]
    event: Option<u32>,
    team_h: u32,
    team_a: u32,
    #[serde(default)]
    team_h_score: Option<u32>,
    #[serde(default)]
    team_a_score: Option<u32>,
    #[serde(default)]
    finished: bool,
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let values: Vec<Value> = serde_json::from_str(trimmed).context("invalid fixtures json")?;
    Ok(values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawFixture>(value).ok())
        .map(|raw| Fixture {
            id: raw.id,
            gameweek: raw.event,
            home_team: raw.team_h,
            away_team: raw.team_a,
            home_score: raw.team_h_score,
            away_score: raw.team_a_score,
            finished: raw.finished,
        })
        .collect())
}

pub fn parse_event_live_json(raw: &str) -> Result<HashMap<u32, u32>> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid live gameweek json")?;
    let mut out = HashMap::new();
    let Some(elements) = root.get("elements").and_then(|v| v.as_array()) else {
        return Ok(out);
    };
    for element in elements {
        let Some(id) = element.get("id").and_then(|v| v.as_u64()) else {
            continue;
        };
        let minutes = element
            .get("stats")
            .and_then(|stats| stats.get("minutes"))
            .and_then(value_to_f64)
            .unwrap_or(0.0);
        *out.entry(id as u32).or_insert(0) += minutes.max(0.0) as u32;
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct RawPicks {
    #[serde(default)]
    picks: Vec<RawPick>,
}

#[derive(Debug, Deserialize)]
struct RawPick {
    element: u32,
    #[serde(default)]
    position: u8,
    #[serde(default)]
    is_captain: bool,
    #[serde(default)]
    is_vice_captain: bool,
}

pub fn parse_picks_json(raw: &str, manager_id: u32, gameweek: u32) -> Result<ManagerSquad> {
    let root: RawPicks = serde_json::from_str(raw.trim()).context("invalid picks json")?;
    let mut picks: Vec<SquadPick> = root
        .picks
        .into_iter()
        .map(|p| SquadPick {
            element: p.element,
            slot: p.position,
            is_captain: p.is_captain,
            is_vice_captain: p.is_vice_captain,
        })
        .collect();
    picks.sort_by_key(|p| p.slot);
    Ok(ManagerSquad {
        manager_id,
        gameweek,
        picks,
    })
}

#[derive(Debug, Deserialize)]
struct RawLeagueStandings {
    #[serde(default)]
    league: Option<RawLeague>,
    #[serde(default)]
    standings: Option<RawStandingsPage>,
}

#[derive(Debug, Deserialize)]
struct RawLeague {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawStandingsPage {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawStanding {
    entry: u32,
    #[serde(default)]
    entry_name: String,
    #[serde(default)]
    player_name: Option<String>,
    #[serde(default)]
    player_first_name: Option<String>,
    #[serde(default)]
    player_last_name: Option<String>,
    #[serde(default)]
    rank: u32,
    #[serde(default)]
    total: i32,
    #[serde(default)]
    event_total: i32,
}

/// Standings rows that do not parse are dropped; rows keep the provider's
/// rank order.
pub fn parse_league_standings_json(raw: &str, league_id: u32) -> Result<LeagueStandings> {
    let root: RawLeagueStandings =
        serde_json::from_str(raw.trim()).context("invalid league standings json")?;
    let league = root.league;
    let mut standings: Vec<LeagueStanding> = root
        .standings
        .map(|page| page.results)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawStanding>(value).ok())
        .map(|raw| {
            let player_name = raw.player_name.unwrap_or_else(|| {
                let first = raw.player_first_name.unwrap_or_default();
                let last = raw.player_last_name.unwrap_or_default();
                format!("{first} {last}").trim().to_string()
            });
            LeagueStanding {
                manager_id: raw.entry,
                entry_name: raw.entry_name,
                player_name,
                rank: raw.rank,
                total_points: raw.total,
                event_points: raw.event_total,
            }
        })
        .collect();
    standings.sort_by_key(|s| (s.rank, s.manager_id));
    Ok(LeagueStandings {
        league_id: league.as_ref().and_then(|l| l.id).unwrap_or(league_id),
        name: league.map(|l| l.name).unwrap_or_default(),
        standings,
    })
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(default)]
    current: Vec<RawHistoryRow>,
}

#[derive(Debug, Deserialize)]
struct RawHistoryRow {
    event: u32,
    #[serde(default)]
    points: i32,
    #[serde(default)]
    total_points: i32,
    #[serde(default)]
    overall_rank: Option<u32>,
    #[serde(default)]
    event_transfers: u32,
    #[serde(default)]
    event_transfers_cost: u32,
}

pub fn parse_manager_history_json(raw: &str) -> Result<Vec<GameweekHistory>> {
    let root: RawHistory = serde_json::from_str(raw.trim()).context("invalid manager history json")?;
    let mut rows: Vec<GameweekHistory> = root
        .current
        .into_iter()
        .map(|row| GameweekHistory {
            event: row.event,
            points: row.points,
            total_points: row.total_points,
            overall_rank: row.overall_rank,
            transfers: row.event_transfers,
            transfers_cost: row.event_transfers_cost,
        })
        .collect();
    rows.sort_by_key(|r| r.event);
    Ok(rows)
}
