use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://fantasy.premierleague.com/api";
const DEFAULT_EXPORT_PATH: &str = "fpl_views.xlsx";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub manager_id: Option<u32>,
    pub league_id: Option<u32>,
    pub http_timeout_secs: u64,
    pub export_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_base = env::var("FPL_API_BASE")
            .ok()
            .map(|val| val.trim().trim_end_matches('/').to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let manager_id = env::var("FPL_MANAGER_ID")
            .ok()
            .and_then(|val| val.trim().parse::<u32>().ok());
        let league_id = env::var("FPL_LEAGUE_ID")
            .ok()
            .and_then(|val| val.trim().parse::<u32>().ok());
        let http_timeout_secs = env::var("FPL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(30)
            .clamp(5, 120);
        let export_path = env::var("FPL_EXPORT_PATH")
            .ok()
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH));
        Self {
            api_base,
            manager_id,
            league_id,
            http_timeout_secs,
            export_path,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            manager_id: None,
            league_id: None,
            http_timeout_secs: 30,
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
        }
    }
}

/// Weights and thresholds behind every composite score. These are product
/// decisions, so all of them can be overridden from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub value: ValueParams,
    pub differential: DifferentialParams,
    pub emergence: EmergenceParams,
    pub top_players: TopPlayerParams,
    pub replacement: ReplacementParams,
    pub shots: ShotParams,
    pub issues: IssueParams,
    pub league: LeagueParams,
    pub limits: LimitParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueParams {
    pub ppg_weight: f64,
    pub form_weight: f64,
    pub price_weight: f64,
    pub min_games_played: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentialParams {
    pub points_per_90_weight: f64,
    pub xgi_per_90_weight: f64,
    pub form_weight: f64,
    pub ownership_bonus_weight: f64,
    /// Strict upper bound; also the ceiling of the low-ownership bonus.
    pub max_ownership: f64,
    pub min_points_per_90: f64,
    pub min_form: f64,
    /// Regular selection: minutes must exceed this many per played gameweek.
    pub min_minutes_per_gameweek: f64,
    pub outfield_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergenceParams {
    pub form_weight: f64,
    pub points_per_90_weight: f64,
    pub minutes_weight: f64,
    pub ownership_bonus_weight: f64,
    pub xgi_weight: f64,
    pub xgi_multiplier: f64,
    pub max_ownership: f64,
    pub min_minutes_per_gameweek: f64,
    pub min_total_points: i32,
    pub min_points_per_90: f64,
    pub min_form: f64,
    pub min_starts: u32,
    pub outfield_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopPlayerParams {
    pub form_weight: f64,
    pub ppg_weight: f64,
    pub total_points_weight: f64,
    pub min_minutes_per_gameweek: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementParams {
    pub form_weight: f64,
    pub ppg_weight: f64,
    pub ownership_weight: f64,
    pub price_delta_weight: f64,
    /// Added to the outgoing player's price when no budget is given.
    pub default_budget_headroom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShotParams {
    pub shots_per_xg: f64,
    pub on_target_per_xg: f64,
    pub min_minutes: u32,
    pub min_estimated_shots: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueParams {
    pub poor_form_below: f64,
    pub high_weight: u32,
    pub medium_weight: u32,
    pub low_weight: u32,
}

/// Mini-league thresholds; ownership figures are percentages of the
/// league's managers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeagueParams {
    /// Standings entries whose squads are fetched, from the top.
    pub max_managers: usize,
    pub differential_max_league_ownership: f64,
    pub differential_min_global_ownership: f64,
    pub highly_owned_above: f64,
    pub list: usize,
    /// Recommendation targets: players the manager does not own.
    pub target_max_league_ownership: f64,
    pub target_min_global_ownership: f64,
    pub target_min_total_points: i32,
    pub must_have_above: f64,
    pub must_have_limit: usize,
    /// Owned players below this league ownership count as unique.
    pub unique_below: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitParams {
    pub chart: usize,
    pub list: usize,
    pub search: usize,
    pub replacements: usize,
    pub shots_players: usize,
    pub shots_teams: usize,
}

impl Default for ValueParams {
    fn default() -> Self {
        Self {
            ppg_weight: 10.0,
            form_weight: 5.0,
            price_weight: 1.0,
            min_games_played: 1,
        }
    }
}

impl Default for DifferentialParams {
    fn default() -> Self {
        Self {
            points_per_90_weight: 0.4,
            xgi_per_90_weight: 0.3,
            form_weight: 0.2,
            ownership_bonus_weight: 0.1,
            max_ownership: 15.0,
            min_points_per_90: 4.0,
            min_form: 3.0,
            min_minutes_per_gameweek: 30.0,
            outfield_only: true,
        }
    }
}

impl Default for EmergenceParams {
    fn default() -> Self {
        Self {
            form_weight: 0.35,
            points_per_90_weight: 0.25,
            minutes_weight: 0.25,
            ownership_bonus_weight: 0.10,
            xgi_weight: 0.05,
            xgi_multiplier: 2.0,
            max_ownership: 25.0,
            min_minutes_per_gameweek: 60.0,
            min_total_points: 20,
            min_points_per_90: 3.5,
            min_form: 4.5,
            min_starts: 1,
            outfield_only: true,
        }
    }
}

impl Default for TopPlayerParams {
    fn default() -> Self {
        Self {
            form_weight: 0.3,
            ppg_weight: 0.4,
            total_points_weight: 0.3,
            min_minutes_per_gameweek: 45.0,
        }
    }
}

impl Default for ReplacementParams {
    fn default() -> Self {
        Self {
            form_weight: 2.0,
            ppg_weight: 3.0,
            ownership_weight: 0.1,
            price_delta_weight: 0.5,
            default_budget_headroom: 1.0,
        }
    }
}

impl Default for ShotParams {
    fn default() -> Self {
        Self {
            shots_per_xg: 9.0,
            on_target_per_xg: 3.0,
            min_minutes: 90,
            min_estimated_shots: 5.0,
        }
    }
}

impl Default for IssueParams {
    fn default() -> Self {
        Self {
            poor_form_below: 2.0,
            high_weight: 3,
            medium_weight: 2,
            low_weight: 1,
        }
    }
}

impl Default for LeagueParams {
    fn default() -> Self {
        Self {
            max_managers: 25,
            differential_max_league_ownership: 50.0,
            differential_min_global_ownership: 5.0,
            highly_owned_above: 50.0,
            list: 10,
            target_max_league_ownership: 30.0,
            target_min_global_ownership: 10.0,
            target_min_total_points: 30,
            must_have_above: 70.0,
            must_have_limit: 5,
            unique_below: 20.0,
        }
    }
}

impl Default for LimitParams {
    fn default() -> Self {
        Self {
            chart: 10,
            list: 20,
            search: 20,
            replacements: 5,
            shots_players: 30,
            shots_teams: 20,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            value: ValueParams::default(),
            differential: DifferentialParams::default(),
            emergence: EmergenceParams::default(),
            top_players: TopPlayerParams::default(),
            replacement: ReplacementParams::default(),
            shots: ShotParams::default(),
            issues: IssueParams::default(),
            league: LeagueParams::default(),
            limits: LimitParams::default(),
        }
    }
}

impl ScoringConfig {
    /// Reads `FPL_SCORING_CONFIG` when set; defaults otherwise.
    pub fn load() -> Result<Self> {
        let Some(path) = env::var("FPL_SCORING_CONFIG")
            .ok()
            .filter(|val| !val.trim().is_empty())
        else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read scoring config {path}"))?;
        Self::from_json(&raw).with_context(|| format!("parse scoring config {path}"))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid scoring config json")
    }
}
