use std::collections::HashMap;

use serde::Serialize;

use crate::config::{
    DifferentialParams, EmergenceParams, ReplacementParams, TopPlayerParams, ValueParams,
};
use crate::model::{Fixture, Player, Position, Team};

pub const MINUTES_PER_MATCH: f64 = 90.0;

/// `stat / (minutes / 90)`, or 0 when the player has not played.
pub fn per_90(stat: f64, minutes: u32) -> f64 {
    if minutes == 0 {
        return 0.0;
    }
    stat / (minutes as f64 / MINUTES_PER_MATCH)
}

/// Team rates are per match played; a match is 90 minutes.
pub fn per_match(stat: f64, matches: u32) -> f64 {
    if matches == 0 {
        return 0.0;
    }
    stat / matches as f64
}

pub fn minutes_per_gameweek(minutes: u32, gameweeks_played: u32) -> f64 {
    if gameweeks_played == 0 {
        return 0.0;
    }
    minutes as f64 / gameweeks_played as f64
}

/// Grows as ownership drops below `ceiling`; never negative.
pub fn low_ownership_bonus(ownership_percent: f64, ceiling: f64) -> f64 {
    (ceiling - ownership_percent).max(0.0)
}

/// Per-player rates read by every ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerRates {
    pub points_per_90: f64,
    pub goals_per_90: f64,
    pub xg_per_90: f64,
    pub xa_per_90: f64,
    pub xgi_per_90: f64,
    pub shots_per_90: f64,
    pub shots_on_target_per_90: f64,
    pub minutes_per_gameweek: f64,
}

impl PlayerRates {
    pub fn derive(player: &Player, gameweeks_played: u32) -> Self {
        let m = player.minutes;
        Self {
            points_per_90: per_90(player.total_points as f64, m),
            goals_per_90: per_90(player.goals_scored as f64, m),
            xg_per_90: per_90(player.expected_goals, m),
            xa_per_90: per_90(player.expected_assists, m),
            xgi_per_90: per_90(player.expected_goal_involvement(), m),
            shots_per_90: per_90(player.shots, m),
            shots_on_target_per_90: per_90(player.shots_on_target, m),
            minutes_per_gameweek: minutes_per_gameweek(m, gameweeks_played),
        }
    }
}

/// `10 * ppg + 5 * form - price`; `None` below the games-played floor.
pub fn value_score(player: &Player, params: &ValueParams) -> Option<f64> {
    if player.games_played < params.min_games_played {
        return None;
    }
    Some(
        params.ppg_weight * player.points_per_game + params.form_weight * player.form
            - params.price_weight * player.price,
    )
}

pub fn differential_score(
    points_per_90: f64,
    xgi_per_90: f64,
    form: f64,
    ownership_percent: f64,
    params: &DifferentialParams,
) -> f64 {
    params.points_per_90_weight * points_per_90
        + params.xgi_per_90_weight * xgi_per_90
        + params.form_weight * form
        + params.ownership_bonus_weight * low_ownership_bonus(ownership_percent, params.max_ownership)
}

pub fn emergence_score(player: &Player, rates: &PlayerRates, params: &EmergenceParams) -> f64 {
    params.form_weight * player.form
        + params.points_per_90_weight * rates.points_per_90
        + params.minutes_weight * (rates.minutes_per_gameweek / MINUTES_PER_MATCH)
        + params.ownership_bonus_weight
            * low_ownership_bonus(player.ownership_percent, params.max_ownership)
        + params.xgi_weight * player.expected_goal_involvement() * params.xgi_multiplier
}

pub fn top_player_score(player: &Player, params: &TopPlayerParams) -> f64 {
    params.form_weight * player.form
        + params.ppg_weight * player.points_per_game
        + params.total_points_weight * player.total_points as f64
}

pub fn replacement_score(candidate: &Player, outgoing_price: f64, params: &ReplacementParams) -> f64 {
    params.form_weight * candidate.form
        + params.ppg_weight * candidate.points_per_game
        + params.ownership_weight * candidate.ownership_percent
        - params.price_delta_weight * (candidate.price - outgoing_price)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamRates {
    pub xga_per_90: f64,
    pub xg_per_90: f64,
    pub goals_per_90: f64,
    pub goals_conceded_per_90: f64,
    pub clean_sheet_rate: f64,
    pub shots_faced_per_90: f64,
    pub shots_per_90: f64,
    pub defensive_efficiency: f64,
    pub offensive_efficiency: f64,
}

impl TeamRates {
    pub fn derive(team: &Team) -> Self {
        let n = team.matches_played;
        let xga_per_90 = per_match(team.expected_goals_against, n);
        let xg_per_90 = per_match(team.expected_goals, n);
        let goals_per_90 = per_match(team.goals_for as f64, n);
        let goals_conceded_per_90 = per_match(team.goals_against as f64, n);
        Self {
            xga_per_90,
            xg_per_90,
            goals_per_90,
            goals_conceded_per_90,
            clean_sheet_rate: per_match(team.clean_sheets as f64, n),
            shots_faced_per_90: per_match(team.shots_faced as f64, n),
            shots_per_90: per_match(team.shots, n),
            defensive_efficiency: goals_conceded_per_90 - xga_per_90,
            offensive_efficiency: goals_per_90 - xg_per_90,
        }
    }
}

/// Fills the season totals of every team. Results come from finished
/// fixtures; xG sums over all players, xGA and saves over goalkeepers only
/// since their minutes cover the whole match.
pub fn aggregate_team_totals(teams: &mut [Team], players: &[Player], fixtures: &[Fixture]) {
    let index: HashMap<u32, usize> = teams.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
    for team in teams.iter_mut() {
        let id = team.id;
        let name = std::mem::take(&mut team.name);
        let short_name = std::mem::take(&mut team.short_name);
        *team = Team {
            id,
            name,
            short_name,
            ..Team::default()
        };
    }

    for fixture in fixtures.iter().filter(|f| f.finished) {
        let (Some(home_goals), Some(away_goals)) = (fixture.home_score, fixture.away_score) else {
            continue;
        };
        if let Some(team) = index.get(&fixture.home_team).map(|i| &mut teams[*i]) {
            record_result(team, home_goals, away_goals);
        }
        if let Some(team) = index.get(&fixture.away_team).map(|i| &mut teams[*i]) {
            record_result(team, away_goals, home_goals);
        }
    }

    for player in players {
        let Some(team) = index.get(&player.team_id).map(|i| &mut teams[*i]) else {
            continue;
        };
        team.expected_goals += player.expected_goals;
        team.shots += player.shots;
        if player.position == Position::Goalkeeper {
            team.expected_goals_against += player.expected_goals_conceded;
            team.saves += player.saves;
        }
    }

    for team in teams.iter_mut() {
        team.shots_faced = team.saves + team.goals_against;
    }
}

fn record_result(team: &mut Team, scored: u32, conceded: u32) {
    team.matches_played += 1;
    team.goals_for += scored;
    team.goals_against += conceded;
    if conceded == 0 {
        team.clean_sheets += 1;
    }
}
