use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_TEAM: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    pub const OUTFIELD: [Position; 3] = [Position::Defender, Position::Midfielder, Position::Forward];

    /// FPL `element_type` codes: 1 GKP, 2 DEF, 3 MID, 4 FWD.
    pub fn from_element_type(code: u8) -> Option<Self> {
        match code {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_uppercase();
        match s.as_str() {
            "GKP" | "GK" | "GOALKEEPER" => Some(Position::Goalkeeper),
            "DEF" | "DEFENDER" => Some(Position::Defender),
            "MID" | "MIDFIELDER" => Some(Position::Midfielder),
            "FWD" | "FW" | "FORWARD" => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GKP",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    Available,
    Injured,
    Doubtful,
    Suspended,
    Unavailable,
}

impl Availability {
    pub fn from_status_code(raw: &str) -> Self {
        match raw.trim() {
            "a" => Availability::Available,
            "i" => Availability::Injured,
            "d" => Availability::Doubtful,
            "s" => Availability::Suspended,
            _ => Availability::Unavailable,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Availability::Available => "Available",
            Availability::Injured => "Injured",
            Availability::Doubtful => "Doubtful",
            Availability::Suspended => "Suspended",
            Availability::Unavailable => "Unavailable",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub web_name: String,
    pub full_name: String,
    pub team_id: u32,
    pub position: Position,
    pub price: f64,
    pub total_points: i32,
    pub games_played: u32,
    pub starts: u32,
    pub minutes: u32,
    pub form: f64,
    pub points_per_game: f64,
    pub ownership_percent: f64,
    pub expected_goals: f64,
    pub expected_assists: f64,
    pub expected_goals_conceded: f64,
    pub shots: f64,
    pub shots_on_target: f64,
    pub goals_scored: u32,
    pub assists: u32,
    pub clean_sheets: u32,
    pub goals_conceded: u32,
    pub saves: u32,
    pub bonus: u32,
    pub availability: Availability,
    pub chance_of_playing_next_round: Option<u8>,
    pub news: String,
}

impl Player {
    pub fn expected_goal_involvement(&self) -> f64 {
        self.expected_goals + self.expected_assists
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    pub matches_played: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub clean_sheets: u32,
    pub expected_goals: f64,
    pub expected_goals_against: f64,
    pub saves: u32,
    pub shots_faced: u32,
    /// Estimated from the squad's xG, like player shots.
    pub shots: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameweekInfo {
    pub played: u32,
    pub current: Option<u32>,
    pub target: u32,
    /// Most recent finished gameweek, if any.
    pub latest_finished: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u32,
    pub gameweek: Option<u32>,
    pub home_team: u32,
    pub away_team: u32,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
    pub gameweeks: GameweekInfo,
    pub last_gameweek_minutes: Option<HashMap<u32, u32>>,
    pub skipped_records: usize,
    team_index: HashMap<u32, usize>,
    player_index: HashMap<u32, usize>,
}

impl Snapshot {
    pub fn new(
        mut players: Vec<Player>,
        mut teams: Vec<Team>,
        gameweeks: GameweekInfo,
        last_gameweek_minutes: Option<HashMap<u32, u32>>,
        skipped_records: usize,
    ) -> Self {
        players.sort_by_key(|p| p.id);
        teams.sort_by_key(|t| t.id);
        let team_index = teams.iter().enumerate().map(|(idx, t)| (t.id, idx)).collect();
        let player_index = players
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id, idx))
            .collect();
        Self {
            fetched_at: Utc::now(),
            players,
            teams,
            gameweeks,
            last_gameweek_minutes,
            skipped_records,
            team_index,
            player_index,
        }
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.player_index.get(&id).and_then(|idx| self.players.get(*idx))
    }

    pub fn team(&self, id: u32) -> Option<&Team> {
        self.team_index.get(&id).and_then(|idx| self.teams.get(*idx))
    }

    pub fn team_name(&self, id: u32) -> &str {
        self.team(id).map(|t| t.name.as_str()).unwrap_or(UNKNOWN_TEAM)
    }

    pub fn team_short_name(&self, id: u32) -> &str {
        self.team(id)
            .map(|t| t.short_name.as_str())
            .unwrap_or(UNKNOWN_TEAM)
    }

    /// `None` when no gameweek has finished yet.
    pub fn last_gameweek_minutes_for(&self, player_id: u32) -> Option<u32> {
        self.last_gameweek_minutes
            .as_ref()
            .map(|minutes| minutes.get(&player_id).copied().unwrap_or(0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadPick {
    pub element: u32,
    pub slot: u8,
    pub is_captain: bool,
    pub is_vice_captain: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerSquad {
    pub manager_id: u32,
    pub gameweek: u32,
    pub picks: Vec<SquadPick>,
}

/// One row of a classic league table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueStanding {
    pub manager_id: u32,
    pub entry_name: String,
    pub player_name: String,
    pub rank: u32,
    pub total_points: i32,
    pub event_points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueStandings {
    pub league_id: u32,
    pub name: String,
    pub standings: Vec<LeagueStanding>,
}

/// A manager's result for one finished gameweek.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameweekHistory {
    pub event: u32,
    pub points: i32,
    pub total_points: i32,
    pub overall_rank: Option<u32>,
    pub transfers: u32,
    pub transfers_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueManager {
    pub standing: LeagueStanding,
    /// `None` when the squad could not be fetched.
    pub squad: Option<ManagerSquad>,
    pub history: Vec<GameweekHistory>,
}

/// A classic league with every fetched manager's squad and history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniLeague {
    pub league_id: u32,
    pub name: String,
    pub gameweek: u32,
    pub managers: Vec<LeagueManager>,
    /// Managers whose squad or history fetch failed.
    pub failed_managers: Vec<u32>,
}

impl MiniLeague {
    pub fn manager(&self, manager_id: u32) -> Option<&LeagueManager> {
        self.managers
            .iter()
            .find(|m| m.standing.manager_id == manager_id)
    }
}
