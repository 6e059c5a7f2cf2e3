use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use fpl_terminal::config::{IssueParams, ScoringConfig, ShotParams};
use fpl_terminal::fpl_fetch::{
    build_snapshot, parse_bootstrap_json, parse_event_live_json, parse_fixtures_json,
    parse_league_standings_json, parse_manager_history_json, parse_picks_json,
};
use fpl_terminal::model::{LeagueManager, MiniLeague, Position, Snapshot};
use fpl_terminal::state::{AnalyticsTab, AppState, Delta, Screen, apply_delta};
use fpl_terminal::team_review::{SquadReview, review_squad};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_snapshot() -> Arc<Snapshot> {
    let bootstrap = parse_bootstrap_json(&read_fixture("bootstrap_static.json"), &ShotParams::default())
        .expect("bootstrap fixture");
    let fixtures = parse_fixtures_json(&read_fixture("fixtures.json")).expect("fixtures fixture");
    let live = parse_event_live_json(&read_fixture("event_live.json")).expect("live fixture");
    Arc::new(build_snapshot(bootstrap, &fixtures, Some(live)))
}

fn fixture_review(snapshot: &Snapshot, manager_id: u32) -> SquadReview {
    let squad = parse_picks_json(&read_fixture("picks.json"), manager_id, 4).expect("picks fixture");
    review_squad(snapshot, &squad, &IssueParams::default())
}

fn loaded_state() -> AppState {
    let mut state = AppState::default();
    state.loading = true;
    apply_delta(&mut state, Delta::SetSnapshot(fixture_snapshot()));
    state
}

#[test]
fn set_snapshot_builds_every_view() {
    let state = loaded_state();
    assert!(!state.loading);
    let views = state.views.as_ref().expect("views built");
    assert_eq!(views.reliability.teams.len(), 3);
    assert_eq!(views.differentials.count, 3);
    assert_eq!(views.emerging.count, 2);
    assert_eq!(views.top_players.positions.len(), 4);
    assert_eq!(views.value.players.len(), 10);
    assert_eq!(views.value.players[0].web_name, "Saka");
    assert!(
        state
            .logs
            .back()
            .is_some_and(|line| line.starts_with("[INFO] Loaded 11 players, 3 teams"))
    );
}

#[test]
fn init_failure_clears_loading_and_logs() {
    let mut state = AppState::default();
    state.loading = true;
    apply_delta(&mut state, Delta::InitFailed("timeout".to_string()));
    assert!(!state.loading);
    assert!(state.views.is_none());
    assert_eq!(
        state.logs.back().map(String::as_str),
        Some("[ERROR] Initialization failed: timeout")
    );
}

#[test]
fn log_buffer_is_capped() {
    let mut state = AppState::default();
    for idx in 0..250 {
        apply_delta(&mut state, Delta::Log(format!("line {idx}")));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("line 50"));
    assert_eq!(state.logs.back().map(String::as_str), Some("line 249"));
}

#[test]
fn team_review_sets_replacements_for_first_slot() {
    let mut state = loaded_state();
    state.manager_input = "42".to_string();
    state.review_loading = true;
    let snapshot = state.snapshot.clone().expect("snapshot");
    apply_delta(&mut state, Delta::SetTeamReview(fixture_review(&snapshot, 42)));

    assert!(!state.review_loading);
    assert_eq!(state.squad_selected, 0);
    let replacements = state.replacements.as_ref().expect("replacements");
    // Slot 1 is Raya; both other keepers fit the budget.
    assert_eq!(replacements.outgoing_id, 1);
    let ids: Vec<u32> = replacements.candidates.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![10, 9]);
}

#[test]
fn moving_through_the_squad_refreshes_replacements() {
    let mut state = loaded_state();
    state.screen = Screen::Transfers;
    let snapshot = state.snapshot.clone().expect("snapshot");
    apply_delta(&mut state, Delta::SetTeamReview(fixture_review(&snapshot, 42)));

    for _ in 0..8 {
        state.select_next();
    }
    assert_eq!(state.selected_review_player().map(|p| p.id), Some(6));
    let replacements = state.replacements.as_ref().expect("replacements");
    assert_eq!(replacements.candidates.len(), 1);
    assert_eq!(replacements.candidates[0].web_name, "Welbeck");

    state.select_prev();
    state.select_prev();
    assert_eq!(state.selected_review_player().map(|p| p.id), Some(5));
}

#[test]
fn stale_team_review_is_ignored() {
    let mut state = loaded_state();
    state.manager_input = "7".to_string();
    state.review_loading = true;
    let snapshot = state.snapshot.clone().expect("snapshot");
    apply_delta(&mut state, Delta::SetTeamReview(fixture_review(&snapshot, 42)));
    assert!(state.review.is_none());
    assert!(state.review_loading);
}

#[test]
fn failed_team_review_logs_warning() {
    let mut state = loaded_state();
    state.review_loading = true;
    apply_delta(
        &mut state,
        Delta::TeamReviewFailed {
            manager_id: 42,
            message: "manager 42 not found".to_string(),
        },
    );
    assert!(!state.review_loading);
    assert_eq!(
        state.logs.back().map(String::as_str),
        Some("[WARN] Team review for 42: manager 42 not found")
    );
}

#[test]
fn export_deltas_track_progress() {
    let mut state = AppState::default();
    apply_delta(
        &mut state,
        Delta::ExportStarted {
            path: "out.xlsx".to_string(),
            total: 0,
        },
    );
    assert!(state.export.active);
    assert!(!state.export.done);

    apply_delta(
        &mut state,
        Delta::ExportProgress {
            current: 3,
            total: 7,
            message: "Wrote Emerging".to_string(),
        },
    );
    assert_eq!(state.export.current, 3);
    assert_eq!(state.export.total, 7);

    apply_delta(
        &mut state,
        Delta::ExportFinished {
            path: "out.xlsx".to_string(),
            sheets: 7,
            rows: 40,
            errors: 0,
        },
    );
    assert!(state.export.done);
    assert_eq!(state.export.current, 7);
    assert_eq!(state.export.message, "Done: 7 sheets, 40 rows (0 errors)");
    assert_eq!(
        state.logs.back().map(String::as_str),
        Some("[INFO] Export finished (0 errors)")
    );
}

#[test]
fn tab_and_position_cycling() {
    let mut state = loaded_state();
    state.selected = 3;
    state.cycle_analytics_tab();
    assert_eq!(state.analytics_tab, AnalyticsTab::Differentials);
    assert_eq!(state.selected, 0);
    for _ in 0..AnalyticsTab::ALL.len() - 1 {
        state.cycle_analytics_tab();
    }
    assert_eq!(state.analytics_tab, AnalyticsTab::Reliability);

    state.cycle_value_position();
    assert_eq!(state.value_position, Some(Position::Goalkeeper));
    let views = state.views.as_ref().expect("views");
    assert_eq!(views.value.players.len(), 3);

    state.cycle_top_players_position();
    assert_eq!(state.top_players_position, Position::Forward);
}

#[test]
fn search_refreshes_with_new_snapshot() {
    let mut state = loaded_state();
    state.screen = Screen::Search;
    state.search_query.text = "ar".to_string();
    state.refresh_search();
    let names: Vec<String> = state
        .search_results
        .as_ref()
        .expect("results")
        .players
        .iter()
        .map(|p| p.web_name.clone())
        .collect();
    assert_eq!(names, vec!["Saka", "Gabriel", "Raya", "Kiwior"]);
    assert_eq!(state.search_detail.as_ref().map(|d| d.player.id), Some(2));

    state.select_next();
    assert_eq!(state.search_detail.as_ref().map(|d| d.player.id), Some(8));

    apply_delta(&mut state, Delta::SetSnapshot(fixture_snapshot()));
    assert_eq!(state.search_results.as_ref().map(|r| r.count), Some(4));
    assert_eq!(state.search_selected, 0);
}

#[test]
fn scoring_config_flows_into_views() {
    let mut scoring = ScoringConfig::default();
    scoring.limits.list = 1;
    let mut state = AppState::new(scoring, Some(42));
    assert_eq!(state.manager_id(), Some(42));
    apply_delta(&mut state, Delta::SetSnapshot(fixture_snapshot()));
    let views = state.views.as_ref().expect("views");
    assert_eq!(views.differentials.count, 1);
    assert_eq!(views.differentials.players[0].web_name, "Welbeck");
}

fn fixture_league() -> MiniLeague {
    let standings = parse_league_standings_json(&read_fixture("league_standings.json"), 314)
        .expect("standings fixture");
    let managers = standings
        .standings
        .into_iter()
        .map(|standing| {
            let id = standing.manager_id;
            let squad = parse_picks_json(&read_fixture(&format!("league_picks_{id}.json")), id, 4)
                .expect("picks fixture");
            let history = match id {
                103 => Vec::new(),
                _ => parse_manager_history_json(&read_fixture(&format!("manager_history_{id}.json")))
                    .expect("history fixture"),
            };
            LeagueManager {
                standing,
                squad: Some(squad),
                history,
            }
        })
        .collect();
    MiniLeague {
        league_id: standings.league_id,
        name: standings.name,
        gameweek: 4,
        managers,
        failed_managers: vec![103],
    }
}

#[test]
fn set_league_builds_view_and_recommendations() {
    let mut state = loaded_state().with_league_id(Some(314));
    state.manager_input = "102".to_string();
    state.league_loading = true;
    apply_delta(&mut state, Delta::SetLeague(fixture_league()));

    assert!(!state.league_loading);
    let view = state.league_view.as_ref().expect("league view");
    assert_eq!(view.standings.len(), 3);
    assert_eq!(view.failed_managers, vec![103]);
    let recs = state.league_recommendations.as_ref().expect("recommendations");
    assert_eq!(recs.manager_id, 102);
    assert!(state.logs.iter().any(|l| l.contains("League 314")));
}

#[test]
fn pinning_a_manager_compares_with_the_selection() {
    let mut state = loaded_state();
    state.screen = Screen::League;
    apply_delta(&mut state, Delta::SetLeague(fixture_league()));

    state.toggle_league_pin();
    assert_eq!(state.league_pinned, Some(101));
    assert!(state.head_to_head.is_none());

    state.select_next();
    let h2h = state.head_to_head.as_ref().expect("head to head");
    assert_eq!(h2h.first.manager_id, 101);
    assert_eq!(h2h.second.manager_id, 102);
    assert_eq!(h2h.points_gap, 10);

    state.select_prev();
    assert!(state.head_to_head.is_none());
    state.toggle_league_pin();
    assert_eq!(state.league_pinned, None);
}

#[test]
fn stale_league_is_ignored() {
    let mut state = loaded_state();
    state.league_input = "99".to_string();
    state.league_loading = true;
    apply_delta(&mut state, Delta::SetLeague(fixture_league()));
    assert!(state.league.is_none());
    assert!(state.league_loading);

    apply_delta(
        &mut state,
        Delta::LeagueFailed {
            league_id: 99,
            message: "league 99 not found".to_string(),
        },
    );
    assert!(!state.league_loading);
    assert!(state.logs.back().is_some_and(|l| l.contains("league 99 not found")));
}
