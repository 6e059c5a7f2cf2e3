use serde::Serialize;

use crate::config::IssueParams;
use crate::model::{Availability, ManagerSquad, Player, Position, Snapshot};
use crate::rankings::{Ranked, sort_ranked};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    Status,
    Form,
    Minutes,
    News,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerReview {
    pub id: u32,
    pub web_name: String,
    pub team_name: String,
    pub position: Position,
    pub price: f64,
    pub total_points: i32,
    pub form: f64,
    pub points_per_game: f64,
    pub minutes: u32,
    pub ownership_percent: f64,
    pub slot: u8,
    pub is_captain: bool,
    pub is_vice_captain: bool,
    pub issues: Vec<Issue>,
    pub priority: u32,
    pub has_issues: bool,
}

impl Ranked for PlayerReview {
    fn rank_score(&self) -> f64 {
        self.priority as f64
    }
    fn rank_points(&self) -> i32 {
        self.total_points
    }
    fn rank_id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquadSummary {
    pub total_value: f64,
    pub total_points: i32,
    pub avg_form: f64,
    pub avg_ppg: f64,
    pub players_with_issues: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquadReview {
    pub manager_id: u32,
    pub gameweek: u32,
    /// Squad order (slot 1..15).
    pub players: Vec<PlayerReview>,
    /// Players with at least one issue, most urgent first.
    pub recommendations: Vec<PlayerReview>,
    pub summary: SquadSummary,
    /// Picked ids missing from the snapshot.
    pub unknown_picks: Vec<u32>,
}

/// `last_gameweek_minutes` is `None` when no gameweek has finished; the
/// minutes check is skipped then.
pub fn detect_issues(player: &Player, last_gameweek_minutes: Option<u32>, params: &IssueParams) -> Vec<Issue> {
    let mut issues = Vec::new();

    if player.availability != Availability::Available {
        let message = match player.chance_of_playing_next_round {
            Some(chance) => format!(
                "Status: {} ({chance}% chance of playing)",
                player.availability.label()
            ),
            None => format!("Status: {}", player.availability.label()),
        };
        issues.push(Issue {
            kind: IssueKind::Status,
            severity: Severity::High,
            message,
        });
    }

    if player.form < params.poor_form_below {
        issues.push(Issue {
            kind: IssueKind::Form,
            severity: Severity::Medium,
            message: format!("Poor form ({:.1})", player.form),
        });
    }

    if last_gameweek_minutes == Some(0) {
        issues.push(Issue {
            kind: IssueKind::Minutes,
            severity: Severity::Medium,
            message: "No minutes in the last gameweek".to_string(),
        });
    }

    if !player.news.trim().is_empty() {
        issues.push(Issue {
            kind: IssueKind::News,
            severity: Severity::Low,
            message: player.news.trim().to_string(),
        });
    }

    issues
}

pub fn priority(issues: &[Issue], params: &IssueParams) -> u32 {
    issues
        .iter()
        .map(|issue| match issue.severity {
            Severity::High => params.high_weight,
            Severity::Medium => params.medium_weight,
            Severity::Low => params.low_weight,
        })
        .sum()
}

pub fn review_squad(snapshot: &Snapshot, squad: &ManagerSquad, params: &IssueParams) -> SquadReview {
    let mut players = Vec::with_capacity(squad.picks.len());
    let mut unknown_picks = Vec::new();

    for pick in &squad.picks {
        let Some(player) = snapshot.player(pick.element) else {
            unknown_picks.push(pick.element);
            continue;
        };
        let issues = detect_issues(player, snapshot.last_gameweek_minutes_for(player.id), params);
        let priority = priority(&issues, params);
        players.push(PlayerReview {
            id: player.id,
            web_name: player.web_name.clone(),
            team_name: snapshot.team_name(player.team_id).to_string(),
            position: player.position,
            price: player.price,
            total_points: player.total_points,
            form: player.form,
            points_per_game: player.points_per_game,
            minutes: player.minutes,
            ownership_percent: player.ownership_percent,
            slot: pick.slot,
            is_captain: pick.is_captain,
            is_vice_captain: pick.is_vice_captain,
            has_issues: !issues.is_empty(),
            issues,
            priority,
        });
    }

    let mut recommendations: Vec<PlayerReview> =
        players.iter().filter(|p| p.has_issues).cloned().collect();
    sort_ranked(&mut recommendations);

    let summary = summarize(&players);
    SquadReview {
        manager_id: squad.manager_id,
        gameweek: squad.gameweek,
        players,
        recommendations,
        summary,
        unknown_picks,
    }
}

fn summarize(players: &[PlayerReview]) -> SquadSummary {
    let n = players.len();
    let mean = |sum: f64| if n == 0 { 0.0 } else { sum / n as f64 };
    SquadSummary {
        total_value: players.iter().map(|p| p.price).sum(),
        total_points: players.iter().map(|p| p.total_points).sum(),
        avg_form: mean(players.iter().map(|p| p.form).sum()),
        avg_ppg: mean(players.iter().map(|p| p.points_per_game).sum()),
        players_with_issues: players.iter().filter(|p| p.has_issues).count(),
    }
}
