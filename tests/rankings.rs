use std::fs;
use std::path::PathBuf;

use fpl_terminal::config::{ScoringConfig, ShotParams};
use fpl_terminal::fpl_fetch::{
    build_snapshot, parse_bootstrap_json, parse_event_live_json, parse_fixtures_json,
};
use fpl_terminal::metrics::TeamRates;
use fpl_terminal::model::{Position, Snapshot, Team};
use fpl_terminal::rankings::{
    self, TeamReliabilityRow, ValueRow, best_attack, best_defense, sort_ranked,
    team_reliability_rows, top_n,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_snapshot() -> Snapshot {
    let bootstrap = parse_bootstrap_json(&read_fixture("bootstrap_static.json"), &ShotParams::default())
        .expect("bootstrap fixture");
    let fixtures = parse_fixtures_json(&read_fixture("fixtures.json")).expect("fixtures fixture");
    let live = parse_event_live_json(&read_fixture("event_live.json")).expect("live fixture");
    build_snapshot(bootstrap, &fixtures, Some(live))
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn ids<T>(rows: &[T], id: impl Fn(&T) -> u32) -> Vec<u32> {
    rows.iter().map(id).collect()
}

fn value_row(id: u32, score: f64, points: i32) -> ValueRow {
    ValueRow {
        id,
        web_name: format!("P{id}"),
        team_name: "Test".to_string(),
        position: Position::Midfielder,
        price: 5.0,
        total_points: points,
        form: 0.0,
        points_per_game: 0.0,
        ownership_percent: 0.0,
        value_score: score,
    }
}

#[test]
fn differentials_filter_and_order() {
    let snapshot = fixture_snapshot();
    let config = ScoringConfig::default();
    let rows = rankings::differentials(&snapshot, &config, 20);

    assert_eq!(ids(&rows, |r| r.id), vec![4, 3, 12]);
    assert!(approx(rows[0].differential_score, 5.94));
    assert!(approx(rows[1].differential_score, 4.76875));
    for row in &rows {
        assert_ne!(row.position, Position::Goalkeeper);
        assert!(row.ownership_percent < config.differential.max_ownership);
        assert!(row.form >= config.differential.min_form);
        assert!(row.points_per_90 >= config.differential.min_points_per_90);
    }
    for pair in rows.windows(2) {
        assert!(pair[0].differential_score >= pair[1].differential_score);
    }
}

#[test]
fn differentials_respect_limit_and_are_idempotent() {
    let snapshot = fixture_snapshot();
    let config = ScoringConfig::default();
    let first = rankings::differentials(&snapshot, &config, 2);
    assert_eq!(ids(&first, |r| r.id), vec![4, 3]);
    assert_eq!(first, rankings::differentials(&snapshot, &config, 2));
    assert!(rankings::differentials(&snapshot, &config, 0).is_empty());
}

#[test]
fn differentials_can_include_goalkeepers() {
    let snapshot = fixture_snapshot();
    let mut config = ScoringConfig::default();
    config.differential.outfield_only = false;
    let rows = rankings::differentials(&snapshot, &config, 20);
    assert_eq!(ids(&rows, |r| r.id), vec![4, 3, 12, 10]);
    assert_eq!(rows[3].position, Position::Goalkeeper);
}

#[test]
fn emerging_requires_form_and_starts() {
    let snapshot = fixture_snapshot();
    let mut config = ScoringConfig::default();
    config.emergence.min_form = 6.5;
    let rows = rankings::emerging(&snapshot, &config, 20);
    assert_eq!(ids(&rows, |r| r.id), vec![4]);

    let mut config = ScoringConfig::default();
    config.emergence.min_starts = 4;
    assert!(rankings::emerging(&snapshot, &config, 20).is_empty());
}

#[test]
fn emerging_requires_regular_minutes() {
    let snapshot = fixture_snapshot();
    let rows = rankings::emerging(&snapshot, &ScoringConfig::default(), 20);
    assert_eq!(ids(&rows, |r| r.id), vec![4, 8]);
    assert!(approx(rows[0].emergence_score, 6.908333));
    assert!(approx(rows[1].emergence_score, 4.556667));
    assert!(approx(rows[0].minutes_per_gameweek, 75.0));
}

#[test]
fn value_rows_skip_players_without_games() {
    let snapshot = fixture_snapshot();
    let rows = rankings::value_rows(&snapshot, &ScoringConfig::default(), None);
    assert_eq!(ids(&rows, |r| r.id), vec![2, 4, 8, 3, 1, 5, 12, 10, 9, 6]);
    assert!(approx(rows[0].value_score, 110.0));
    assert!(rows.iter().all(|r| r.id != 7));

    let keepers = rankings::value_rows(&snapshot, &ScoringConfig::default(), Some(Position::Goalkeeper));
    assert_eq!(ids(&keepers, |r| r.id), vec![1, 10, 9]);
}

#[test]
fn ties_break_on_points_then_id() {
    let rows = vec![
        value_row(5, 10.0, 30),
        value_row(2, 10.0, 40),
        value_row(9, 12.0, 0),
        value_row(1, 10.0, 30),
    ];
    let mut sorted = rows.clone();
    sort_ranked(&mut sorted);
    assert_eq!(ids(&sorted, |r| r.id), vec![9, 2, 1, 5]);

    let top = top_n(rows, 2);
    assert_eq!(ids(&top, |r| r.id), vec![9, 2]);
}

#[test]
fn top_n_with_fewer_rows_than_limit() {
    let top = top_n(vec![value_row(1, 1.0, 0)], 10);
    assert_eq!(top.len(), 1);
    assert!(top_n(Vec::<ValueRow>::new(), 10).is_empty());
}

#[test]
fn top_players_per_position() {
    let snapshot = fixture_snapshot();
    let config = ScoringConfig::default();
    let mids = rankings::top_players_for_position(&snapshot, &config, Position::Midfielder, 10);
    assert_eq!(ids(&mids, |r| r.id), vec![2, 3, 5]);
    assert!(approx(mids[0].score, 12.8));
    assert!(approx(mids[2].score, 9.43));

    // Kiwior has no minutes and drops out.
    let defs = rankings::top_players_for_position(&snapshot, &config, Position::Defender, 10);
    assert_eq!(ids(&defs, |r| r.id), vec![8, 12]);

    let keepers = rankings::top_players_for_position(&snapshot, &config, Position::Goalkeeper, 2);
    assert_eq!(ids(&keepers, |r| r.id), vec![1, 10]);
}

#[test]
fn replacements_same_position_within_budget() {
    let snapshot = fixture_snapshot();
    let config = ScoringConfig::default();

    let jackson = snapshot.player(6).expect("jackson");
    let rows = rankings::replacements_for(&snapshot, &config, jackson, 8.5, 5);
    assert_eq!(ids(&rows, |r| r.id), vec![4]);
    assert!(approx(rows[0].replacement_score, 36.25));

    let kiwior = snapshot.player(7).expect("kiwior");
    let rows = rankings::replacements_for(&snapshot, &config, kiwior, 5.5, 5);
    assert_eq!(ids(&rows, |r| r.id), vec![12]);
    assert!(approx(rows[0].replacement_score, 23.75));

    let rows = rankings::replacements_for(&snapshot, &config, kiwior, 4.0, 5);
    assert!(rows.is_empty());
}

#[test]
fn replacements_skip_unavailable_candidates() {
    let snapshot = fixture_snapshot();
    let config = ScoringConfig::default();
    // Palmer is doubtful so he is never offered for another midfielder.
    let mitoma = snapshot.player(3).expect("mitoma");
    let rows = rankings::replacements_for(&snapshot, &config, mitoma, 20.0, 5);
    assert_eq!(ids(&rows, |r| r.id), vec![2]);
}

#[test]
fn shots_breakdown_groups() {
    let snapshot = fixture_snapshot();
    let shots = rankings::shots_breakdown(&snapshot, &ScoringConfig::default());

    assert_eq!(ids(&shots.by_player, |r| r.id), vec![2, 4, 6, 5, 3]);
    assert!(approx(shots.by_player[0].shots_per_90, 4.5));
    assert!(approx(shots.by_player[1].shots_per_90, 4.32));
    assert!(shots.by_player.iter().all(|r| r.position != Position::Goalkeeper));

    let positions: Vec<Position> = shots.by_position.iter().map(|r| r.position).collect();
    assert_eq!(
        positions,
        vec![Position::Defender, Position::Midfielder, Position::Forward]
    );

    let teams: Vec<u32> = shots.by_team.iter().map(|r| r.team_id).collect();
    assert_eq!(teams, vec![2, 3, 1]);
    assert!(approx(shots.by_team[0].shots_per_match, 6.9));
}

#[test]
fn team_reliability_orders() {
    let snapshot = fixture_snapshot();
    let rows = team_reliability_rows(&snapshot);
    assert_eq!(rows.len(), 3);

    let arsenal = rows.iter().find(|r| r.id == 1).expect("arsenal");
    assert_eq!(arsenal.matches_played, 2);
    assert!(approx(arsenal.rates.xga_per_90, 1.05));
    assert!(approx(arsenal.rates.clean_sheet_rate, 0.5));
    assert!(approx(arsenal.rates.shots_faced_per_90, 3.5));
    assert!(approx(arsenal.rates.shots_per_90, 8.1));

    let defense: Vec<u32> = best_defense(rows.clone()).iter().map(|r| r.id).collect();
    assert_eq!(defense, vec![1, 2, 3]);
    let attack: Vec<u32> = best_attack(rows).iter().map(|r| r.id).collect();
    assert_eq!(attack, vec![2, 3, 1]);
}

#[test]
fn best_lists_skip_teams_without_matches() {
    let snapshot = fixture_snapshot();
    let mut rows = team_reliability_rows(&snapshot);
    let promoted = Team {
        id: 4,
        name: "Ipswich".to_string(),
        short_name: "IPS".to_string(),
        ..Team::default()
    };
    rows.push(TeamReliabilityRow {
        id: promoted.id,
        name: promoted.name.clone(),
        short_name: promoted.short_name.clone(),
        matches_played: 0,
        rates: TeamRates::derive(&promoted),
    });

    let defense: Vec<u32> = best_defense(rows.clone()).iter().map(|r| r.id).collect();
    assert_eq!(defense, vec![1, 2, 3]);
    let attack: Vec<u32> = best_attack(rows).iter().map(|r| r.id).collect();
    assert_eq!(attack, vec![2, 3, 1]);
}
