use std::fs;
use std::path::PathBuf;

use fpl_terminal::api::{self, ApiError};
use fpl_terminal::config::{LeagueParams, ScoringConfig, ShotParams};
use fpl_terminal::fpl_fetch::{
    build_snapshot, parse_bootstrap_json, parse_event_live_json, parse_fixtures_json,
    parse_league_standings_json, parse_manager_history_json, parse_picks_json,
};
use fpl_terminal::mini_league::{
    captain_picks, head_to_head, highly_owned, league_differentials, league_ownership,
    league_performance, recommendations,
};
use fpl_terminal::model::{LeagueManager, MiniLeague, Snapshot};

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

/// Three managers with squads; 103 has no history and counts as failed.
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
            let history = if id == 103 {
                Vec::new()
            } else {
                parse_manager_history_json(&read_fixture(&format!("manager_history_{id}.json")))
                    .expect("history fixture")
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

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn ids<T>(rows: &[T], id: impl Fn(&T) -> u32) -> Vec<u32> {
    rows.iter().map(id).collect()
}

#[test]
fn performance_in_rank_order() {
    let league = fixture_league();
    let rows = league_performance(&league);
    assert_eq!(ids(&rows, |r| r.manager_id), vec![101, 102, 103]);

    let alice = &rows[0];
    assert_eq!(alice.gameweeks, 3);
    assert!(approx(alice.avg_points, 190.0 / 3.0));
    assert!(approx(alice.consistency, 100.0 - (325.0f64 / 3.0).sqrt()));
    assert_eq!(alice.best_gameweek, 75);
    assert_eq!(alice.worst_gameweek, 55);
    assert_eq!(alice.transfer_cost, 4);
    assert_eq!(alice.hits_taken, 1);
    assert!(approx(alice.points_per_hit, 190.0));

    let bob = &rows[1];
    assert_eq!(bob.player_name, "Bob Jones");
    assert!(approx(bob.avg_points, 60.0));
    assert!(approx(bob.consistency, 90.0));
    assert_eq!(bob.transfer_cost, 8);
}

#[test]
fn manager_without_history_scores_zero() {
    let league = fixture_league();
    let rows = league_performance(&league);
    let cara = &rows[2];
    assert_eq!(cara.gameweeks, 0);
    assert_eq!(cara.avg_points, 0.0);
    assert_eq!(cara.consistency, 0.0);
    assert_eq!(cara.best_gameweek, 0);
    assert_eq!(cara.hits_taken, 0);
    assert!(approx(cara.points_per_hit, 150.0));
}

#[test]
fn single_gameweek_is_fully_consistent() {
    let mut league = fixture_league();
    league.managers[0].history.truncate(1);
    let rows = league_performance(&league);
    assert!(approx(rows[0].consistency, 100.0));
    assert!(approx(rows[0].avg_points, 60.0));
}

#[test]
fn ownership_counts_fetched_squads() {
    let snapshot = fixture_snapshot();
    let league = fixture_league();
    let rows = league_ownership(&league, &snapshot);

    // 999 is not in the player list.
    assert_eq!(rows.len(), 11);
    assert!(rows.iter().all(|r| r.id != 999));

    let welbeck = rows.iter().find(|r| r.id == 4).expect("welbeck");
    assert_eq!(welbeck.owners, 3);
    assert_eq!(welbeck.captain_count, 1);
    assert_eq!(welbeck.vice_captain_count, 2);
    assert!(approx(welbeck.league_ownership_percent, 100.0));
    assert!(approx(welbeck.differential_score, 0.05));

    let saka = rows.iter().find(|r| r.id == 2).expect("saka");
    assert_eq!(saka.team_name, "ARS");
    assert!(approx(saka.league_ownership_percent, 100.0 / 3.0));
    assert!(approx(saka.differential_score, 1.35));
    assert_eq!(rows[0].id, 2);

    let mut without_squad = league.clone();
    without_squad.managers[2].squad = None;
    let rows = league_ownership(&without_squad, &snapshot);
    let saka = rows.iter().find(|r| r.id == 2).expect("saka");
    assert!(approx(saka.league_ownership_percent, 50.0));
}

#[test]
fn ownership_without_squads_is_empty() {
    let snapshot = fixture_snapshot();
    let mut league = fixture_league();
    for manager in &mut league.managers {
        manager.squad = None;
    }
    assert!(league_ownership(&league, &snapshot).is_empty());
}

#[test]
fn league_lists() {
    let snapshot = fixture_snapshot();
    let league = fixture_league();
    let params = LeagueParams::default();
    let rows = league_ownership(&league, &snapshot);

    let differentials = league_differentials(&rows, &params);
    assert_eq!(ids(&differentials, |r| r.id), vec![2, 6, 9, 10]);

    let template = highly_owned(&rows, &params);
    assert_eq!(ids(&template, |r| r.id), vec![4, 1, 12, 5, 8, 3]);

    let captains = captain_picks(&rows, params.list);
    assert_eq!(ids(&captains, |r| r.id), vec![2, 4, 5]);
    assert_eq!(ids(&captain_picks(&rows, 1), |r| r.id), vec![2]);

    let narrow = LeagueParams {
        list: 2,
        ..LeagueParams::default()
    };
    assert_eq!(ids(&league_differentials(&rows, &narrow), |r| r.id), vec![2, 6]);
}

#[test]
fn recommendations_skip_owned_players() {
    let snapshot = fixture_snapshot();
    let league = fixture_league();
    let rows = league_ownership(&league, &snapshot);

    let defaults = recommendations(&league, &rows, 102, &LeagueParams::default()).expect("in league");
    assert!(defaults.targets.is_empty());
    assert!(defaults.must_haves.is_empty());
    assert!(defaults.unique.is_empty());

    let loose = LeagueParams {
        target_max_league_ownership: 40.0,
        target_min_total_points: 20,
        must_have_above: 60.0,
        unique_below: 40.0,
        ..LeagueParams::default()
    };
    let bob = recommendations(&league, &rows, 102, &loose).expect("in league");
    assert_eq!(ids(&bob.targets, |r| r.id), vec![2]);
    assert_eq!(ids(&bob.must_haves, |r| r.id), vec![5]);
    assert_eq!(ids(&bob.unique, |r| r.id), vec![9]);

    let cara = recommendations(&league, &rows, 103, &loose).expect("in league");
    assert_eq!(ids(&cara.must_haves, |r| r.id), vec![8, 3]);
    assert_eq!(ids(&cara.unique, |r| r.id), vec![10]);

    assert!(recommendations(&league, &rows, 555, &loose).is_none());
}

#[test]
fn head_to_head_compares_squads_and_history() {
    let snapshot = fixture_snapshot();
    let league = fixture_league();
    let h2h = head_to_head(&league, &snapshot, 101, 102).expect("both in league");

    assert_eq!(h2h.points_gap, 10);
    assert_eq!(ids(&h2h.progression, |g| g.event), vec![1, 2, 3]);
    assert_eq!(h2h.progression[0].first_points, Some(60));
    assert_eq!(h2h.progression[0].second_points, Some(70));
    assert_eq!(h2h.progression[2].second_total, Some(180));
    assert_eq!(h2h.shared_players, vec!["Raya", "Gabriel", "Dunk", "Mitoma", "Welbeck"]);
    assert_eq!(h2h.only_first, vec!["Kiwior", "Saka", "Palmer", "Jackson"]);
    assert_eq!(h2h.only_second, vec!["Sanchez"]);

    let uneven = head_to_head(&league, &snapshot, 101, 103).expect("both in league");
    assert_eq!(uneven.progression.len(), 3);
    assert!(uneven.progression.iter().all(|g| g.second_points.is_none()));
    assert!(head_to_head(&league, &snapshot, 101, 555).is_none());
}

#[test]
fn league_view_and_errors() {
    let snapshot = fixture_snapshot();
    let scoring = ScoringConfig::default();
    let league = fixture_league();

    let view = api::mini_league_view(&snapshot, &scoring, &league);
    assert_eq!(view.league_id, 314);
    assert_eq!(view.name, "Office League");
    assert_eq!(view.managers, 3);
    assert_eq!(view.squads_fetched, 3);
    assert_eq!(view.failed_managers, vec![103]);
    assert_eq!(ids(&view.standings, |m| m.manager_id), vec![101, 102, 103]);
    assert_eq!(ids(&view.differentials, |r| r.id), vec![2, 6, 9, 10]);
    assert_eq!(ids(&view.captains, |r| r.id), vec![2, 4, 5]);

    let err = api::head_to_head(&snapshot, &league, 101, 555).expect_err("unknown manager");
    assert!(matches!(err, ApiError::NotFound { kind: "manager", id: 555 }));

    let mut without_squad = league.clone();
    without_squad.managers[1].squad = None;
    let err = api::league_recommendations(&snapshot, &scoring, &without_squad, 102)
        .expect_err("no squad");
    assert!(matches!(err, ApiError::NotFound { kind: "squad", id: 102 }));
    assert!(api::league_recommendations(&snapshot, &scoring, &league, 101).is_ok());
}
