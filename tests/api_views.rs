use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;

use fpl_terminal::api::{self, ApiError, SearchQuery, SortKey};
use fpl_terminal::config::{AppConfig, ScoringConfig, ShotParams};
use fpl_terminal::fpl_fetch::{
    build_snapshot, parse_bootstrap_json, parse_event_live_json, parse_fixtures_json,
};
use fpl_terminal::http_cache::HttpStatusError;
use fpl_terminal::model::{GameweekInfo, Position, Snapshot};

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

fn names<'a>(rows: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    rows.collect()
}

#[test]
fn init_summary_counts() {
    let snapshot = fixture_snapshot();
    let summary = api::init_summary(&snapshot);
    assert_eq!(summary.players, 11);
    assert_eq!(summary.teams, 3);
    assert_eq!(summary.skipped_records, 3);
    assert_eq!(summary.gameweeks.played, 3);
    assert_eq!(summary.gameweeks.current, Some(4));
}

#[test]
fn reliability_view_truncates_best_lists() {
    let snapshot = fixture_snapshot();
    let mut scoring = ScoringConfig::default();
    scoring.limits.chart = 2;
    let view = api::team_reliability(&snapshot, &scoring);
    assert_eq!(view.gameweeks_played, 3);
    assert_eq!(view.teams.len(), 3);
    assert_eq!(names(view.best_defense.iter().map(|t| t.short_name.as_str())), vec!["ARS", "BHA"]);
    assert_eq!(names(view.best_attack.iter().map(|t| t.short_name.as_str())), vec!["BHA", "CHE"]);
}

#[test]
fn list_views_use_configured_defaults() {
    let snapshot = fixture_snapshot();
    let scoring = ScoringConfig::default();
    let differentials = api::differentials(&snapshot, &scoring, None);
    assert_eq!(differentials.count, 3);
    assert_eq!(differentials.players.len(), differentials.count);
    assert_eq!(api::differentials(&snapshot, &scoring, Some(1)).count, 1);
    assert_eq!(api::emerging(&snapshot, &scoring, None).count, 2);
}

#[test]
fn top_players_cover_every_position() {
    let snapshot = fixture_snapshot();
    let view = api::top_players(&snapshot, &ScoringConfig::default(), Some(1));
    let positions: Vec<Position> = view.positions.iter().map(|g| g.position).collect();
    assert_eq!(positions, Position::ALL.to_vec());
    let leaders: Vec<&str> = view
        .positions
        .iter()
        .map(|g| g.players[0].web_name.as_str())
        .collect();
    assert_eq!(leaders, vec!["Raya", "Gabriel", "Saka", "Welbeck"]);
}

#[test]
fn value_view_by_position() {
    let snapshot = fixture_snapshot();
    let scoring = ScoringConfig::default();
    let forwards = api::value(&snapshot, &scoring, Some(Position::Forward), None);
    assert_eq!(forwards.position, Some(Position::Forward));
    assert_eq!(names(forwards.players.iter().map(|p| p.web_name.as_str())), vec!["Welbeck", "Jackson"]);

    let top3 = api::value(&snapshot, &scoring, None, Some(3));
    assert_eq!(top3.count, 3);
    assert_eq!(names(top3.players.iter().map(|p| p.web_name.as_str())), vec!["Saka", "Welbeck", "Gabriel"]);
}

#[test]
fn shots_view_has_three_groups() {
    let snapshot = fixture_snapshot();
    let view = api::shots(&snapshot, &ScoringConfig::default());
    assert_eq!(view.players.len(), 5);
    assert_eq!(view.positions.len(), 3);
    assert_eq!(view.teams.len(), 3);
}

#[test]
fn search_matches_player_or_team_name() {
    let snapshot = fixture_snapshot();
    let scoring = ScoringConfig::default();
    let query = SearchQuery {
        text: "AR".to_string(),
        ..SearchQuery::default()
    };
    let results = api::search(&snapshot, &scoring, &query);
    assert_eq!(
        names(results.players.iter().map(|p| p.web_name.as_str())),
        vec!["Saka", "Gabriel", "Raya", "Kiwior"]
    );
    // Kiwior has no games so he has no value score and sorts last.
    assert_eq!(results.players[3].value_score, None);
}

#[test]
fn search_filters_and_sorts() {
    let snapshot = fixture_snapshot();
    let scoring = ScoringConfig::default();
    let query = SearchQuery {
        position: Some(Position::Goalkeeper),
        sort: SortKey::Price,
        ..SearchQuery::default()
    };
    let results = api::search(&snapshot, &scoring, &query);
    assert_eq!(results.sort, SortKey::Price);
    assert_eq!(
        names(results.players.iter().map(|p| p.web_name.as_str())),
        vec!["Raya", "Sanchez", "Verbruggen"]
    );

    let query = SearchQuery {
        min_price: Some(7.0),
        max_price: Some(10.0),
        sort: SortKey::TotalPoints,
        ..SearchQuery::default()
    };
    let results = api::search(&snapshot, &scoring, &query);
    assert_eq!(names(results.players.iter().map(|p| p.web_name.as_str())), vec!["Saka", "Jackson"]);

    let query = SearchQuery {
        text: "nobody".to_string(),
        ..SearchQuery::default()
    };
    assert_eq!(api::search(&snapshot, &scoring, &query).count, 0);
}

#[test]
fn sort_keys_parse_and_cycle() {
    assert_eq!(SortKey::from_label("PPG"), Some(SortKey::PointsPerGame));
    assert_eq!(SortKey::from_label("bogus"), None);
    assert_eq!(SortKey::Ownership.next(), SortKey::ValueScore);
    for key in SortKey::ALL {
        assert_eq!(SortKey::from_label(key.label()), Some(key));
    }
}

#[test]
fn player_detail_and_missing_player() {
    let snapshot = fixture_snapshot();
    let scoring = ScoringConfig::default();
    let detail = api::player_detail(&snapshot, &scoring, 5).expect("palmer");
    assert_eq!(detail.team_name, "Chelsea");
    assert_eq!(detail.availability, "Doubtful");
    assert_eq!(detail.last_gameweek_minutes, Some(90));
    assert_eq!(detail.value_score, Some(69.0));

    let kiwior = api::player_detail(&snapshot, &scoring, 7).expect("kiwior");
    assert_eq!(kiwior.last_gameweek_minutes, Some(0));
    assert_eq!(kiwior.rates.points_per_90, 0.0);

    let err = api::player_detail(&snapshot, &scoring, 404).expect_err("unknown id");
    assert!(matches!(err, ApiError::NotFound { kind: "player", id: 404 }));
    assert_eq!(err.to_string(), "player 404 not found");
}

#[test]
fn replacements_default_budget() {
    let snapshot = fixture_snapshot();
    let scoring = ScoringConfig::default();
    let view = api::replacements(&snapshot, &scoring, 6, None, None).expect("jackson");
    assert_eq!(view.outgoing_name, "Jackson");
    assert!((view.max_price - 8.5).abs() < 1e-9);
    assert_eq!(view.count, 1);
    assert_eq!(view.candidates[0].web_name, "Welbeck");

    let view = api::replacements(&snapshot, &scoring, 6, Some(5.0), None).expect("jackson");
    assert!(view.candidates.is_empty());

    assert!(matches!(
        api::replacements(&snapshot, &scoring, 999, None, None),
        Err(ApiError::NotFound { .. })
    ));
}

#[test]
fn team_review_needs_a_gameweek() {
    let snapshot = Snapshot::new(Vec::new(), Vec::new(), GameweekInfo::default(), None, 0);
    let err = api::team_review(&AppConfig::default(), &snapshot, &ScoringConfig::default(), 42)
        .expect_err("no gameweek");
    assert!(matches!(err, ApiError::NoGameweek));
}

#[test]
fn upstream_errors_keep_context() {
    let err: ApiError = anyhow::anyhow!("connection refused")
        .context("fetch bootstrap-static")
        .into();
    assert_eq!(
        err.to_string(),
        "upstream fetch failed: fetch bootstrap-static: connection refused"
    );
}

#[test]
fn provider_404_maps_to_not_found() {
    let err = anyhow::Error::from(HttpStatusError {
        status: 404,
        body: "The game is being updated.".to_string(),
    })
    .context("picks fetch failed for manager 7");
    let mapped = api::classify_fetch_error(err, "manager", 7);
    assert!(matches!(mapped, ApiError::NotFound { kind: "manager", id: 7 }));
    assert_eq!(mapped.to_string(), "manager 7 not found");

    let err = anyhow::Error::from(HttpStatusError {
        status: 500,
        body: "boom".to_string(),
    })
    .context("picks fetch failed for manager 8");
    let mapped = api::classify_fetch_error(err, "manager", 8);
    assert!(matches!(mapped, ApiError::Upstream(_)));
    assert_eq!(
        mapped.to_string(),
        "upstream fetch failed: picks fetch failed for manager 8: http 500: boom"
    );
}

/// Serves canned responses on a local port; one connection per request.
fn spawn_stub_api(respond: fn(&str) -> (u16, String)) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let addr = listener.local_addr().expect("local addr");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let Ok(read_half) = stream.try_clone() else {
                continue;
            };
            let mut reader = BufReader::new(read_half);
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if header == "\r\n" => break,
                    Ok(_) => {}
                }
            }
            let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
            let (status, body) = respond(&path);
            let reason = match status {
                200 => "OK",
                404 => "Not Found",
                _ => "Internal Server Error",
            };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}")
}

fn stub_routes(path: &str) -> (u16, String) {
    match path {
        "/entry/7/event/4/picks/" => (404, r#"{"detail":"Not found."}"#.to_string()),
        "/entry/8/event/4/picks/" => (500, "boom".to_string()),
        "/entry/9/event/4/picks/" => (200, r#"{"picks":[]}"#.to_string()),
        "/entry/42/event/4/picks/" => (200, read_fixture("picks.json")),
        "/leagues-classic/314/standings/?page_standings=1" => {
            (200, read_fixture("league_standings.json"))
        }
        "/entry/101/event/4/picks/" => (200, read_fixture("league_picks_101.json")),
        "/entry/102/event/4/picks/" => (200, read_fixture("league_picks_102.json")),
        "/entry/103/event/4/picks/" => (200, read_fixture("league_picks_103.json")),
        "/entry/101/history/" => (200, read_fixture("manager_history_101.json")),
        "/entry/102/history/" => (200, read_fixture("manager_history_102.json")),
        "/entry/103/history/" => (500, "history offline".to_string()),
        _ => (404, r#"{"detail":"Not found."}"#.to_string()),
    }
}

fn stub_config() -> AppConfig {
    AppConfig {
        api_base: spawn_stub_api(stub_routes),
        ..AppConfig::default()
    }
}

#[test]
fn team_review_maps_provider_responses() {
    let config = stub_config();
    let snapshot = fixture_snapshot();
    let scoring = ScoringConfig::default();

    let err = api::team_review(&config, &snapshot, &scoring, 7).expect_err("unknown manager");
    assert!(matches!(err, ApiError::NotFound { kind: "manager", id: 7 }));

    let err = api::team_review(&config, &snapshot, &scoring, 8).expect_err("server error");
    assert!(matches!(err, ApiError::Upstream(_)));
    let message = err.to_string();
    assert!(message.contains("picks fetch failed for manager 8"), "{message}");
    assert!(message.contains("http 500: boom"), "{message}");

    let err = api::team_review(&config, &snapshot, &scoring, 9).expect_err("empty squad");
    assert!(matches!(err, ApiError::NotFound { kind: "squad", id: 9 }));

    let review = api::team_review(&config, &snapshot, &scoring, 42).expect("fixture squad");
    assert_eq!(review.manager_id, 42);
    assert_eq!(review.gameweek, 4);
    assert_eq!(review.unknown_picks, vec![999]);
}

#[test]
fn mini_league_fetches_every_manager() {
    let config = stub_config();
    let snapshot = fixture_snapshot();
    let scoring = ScoringConfig::default();

    let league = api::mini_league(&config, &snapshot, &scoring, 314).expect("league");
    assert_eq!(league.name, "Office League");
    assert_eq!(league.gameweek, 4);
    let ids: Vec<u32> = league.managers.iter().map(|m| m.standing.manager_id).collect();
    assert_eq!(ids, vec![101, 102, 103]);
    assert_eq!(league.failed_managers, vec![103]);
    let cara = league.manager(103).expect("cara");
    assert!(cara.squad.is_some());
    assert!(cara.history.is_empty());
    assert_eq!(league.manager(101).map(|m| m.history.len()), Some(3));

    let mut capped = ScoringConfig::default();
    capped.league.max_managers = 1;
    let league = api::mini_league(&config, &snapshot, &capped, 314).expect("league");
    assert_eq!(league.managers.len(), 1);
    assert!(league.failed_managers.is_empty());

    let err = api::mini_league(&config, &snapshot, &scoring, 999).expect_err("unknown league");
    assert!(matches!(err, ApiError::NotFound { kind: "league", id: 999 }));
}
