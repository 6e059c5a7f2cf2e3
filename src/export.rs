use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::api;
use crate::config::ScoringConfig;
use crate::model::Snapshot;

pub struct ExportReport {
    pub sheets: usize,
    pub rows: usize,
}

pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

struct Sheet {
    name: &'static str,
    rows: Vec<Vec<String>>,
}

/// One worksheet per analytics view, built from the given snapshot.
pub fn export_views_with_progress(
    path: &Path,
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
    mut on_progress: impl FnMut(ExportProgress),
) -> Result<ExportReport> {
    let sheets = build_sheets(snapshot, scoring);
    let total = sheets.len();

    let mut workbook = Workbook::new();
    let mut rows = 0usize;
    for (idx, sheet) in sheets.iter().enumerate() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;
        write_rows(worksheet, &sheet.rows)?;
        rows += sheet.rows.len().saturating_sub(1);
        on_progress(ExportProgress {
            current: idx + 1,
            total,
            message: format!("Wrote {}", sheet.name),
        });
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        sheets: total,
        rows,
    })
}

fn build_sheets(snapshot: &Snapshot, scoring: &ScoringConfig) -> Vec<Sheet> {
    let reliability = api::team_reliability(snapshot, scoring);
    let differentials = api::differentials(snapshot, scoring, None);
    let emerging = api::emerging(snapshot, scoring, None);
    let shots = api::shots(snapshot, scoring);
    let top = api::top_players(snapshot, scoring, None);
    let value = api::value(snapshot, scoring, None, None);

    let mut reliability_rows = vec![header(&[
        "Team", "Matches", "xGA/90", "xG/90", "Goals/90", "Conceded/90", "Clean sheet %",
        "Shots faced/90", "Shots/90", "Def efficiency", "Off efficiency",
    ])];
    reliability_rows.extend(reliability.teams.iter().map(|t| {
        vec![
            t.name.clone(),
            t.matches_played.to_string(),
            num(t.rates.xga_per_90),
            num(t.rates.xg_per_90),
            num(t.rates.goals_per_90),
            num(t.rates.goals_conceded_per_90),
            num(t.rates.clean_sheet_rate * 100.0),
            num(t.rates.shots_faced_per_90),
            num(t.rates.shots_per_90),
            num(t.rates.defensive_efficiency),
            num(t.rates.offensive_efficiency),
        ]
    }));

    let mut differential_rows = vec![header(&[
        "ID", "Player", "Team", "Pos", "Price", "Points", "Form", "Pts/90", "xGI/90", "Owned %",
        "Score",
    ])];
    differential_rows.extend(differentials.players.iter().map(|p| {
        vec![
            p.id.to_string(),
            p.web_name.clone(),
            p.team_name.clone(),
            p.position.short_label().to_string(),
            num(p.price),
            p.total_points.to_string(),
            num(p.form),
            num(p.points_per_90),
            num(p.xgi_per_90),
            num(p.ownership_percent),
            num(p.differential_score),
        ]
    }));

    let mut emerging_rows = vec![header(&[
        "ID", "Player", "Team", "Pos", "Price", "Points", "Form", "Pts/90", "Min/GW", "Owned %",
        "Score",
    ])];
    emerging_rows.extend(emerging.players.iter().map(|p| {
        vec![
            p.id.to_string(),
            p.web_name.clone(),
            p.team_name.clone(),
            p.position.short_label().to_string(),
            num(p.price),
            p.total_points.to_string(),
            num(p.form),
            num(p.points_per_90),
            num(p.minutes_per_gameweek),
            num(p.ownership_percent),
            num(p.emergence_score),
        ]
    }));

    let mut shot_rows = vec![header(&[
        "ID", "Player", "Team", "Pos", "Shots/90", "On target/90", "xG/90", "Goals", "Points",
    ])];
    shot_rows.extend(shots.players.iter().map(|p| {
        vec![
            p.id.to_string(),
            p.web_name.clone(),
            p.team_name.clone(),
            p.position.short_label().to_string(),
            num(p.shots_per_90),
            num(p.shots_on_target_per_90),
            num(p.xg_per_90),
            p.goals_scored.to_string(),
            p.total_points.to_string(),
        ]
    }));

    let mut team_shot_rows = vec![header(&[
        "Team", "Shots/match", "On target/match", "xG/match", "Goals",
    ])];
    team_shot_rows.extend(shots.teams.iter().map(|t| {
        vec![
            t.team_name.clone(),
            num(t.shots_per_match),
            num(t.shots_on_target_per_match),
            num(t.xg_per_match),
            t.goals_scored.to_string(),
        ]
    }));

    let mut top_rows = vec![header(&[
        "Pos", "Rank", "ID", "Player", "Team", "Price", "Points", "Form", "PPG", "Score",
    ])];
    for group in &top.positions {
        top_rows.extend(group.players.iter().enumerate().map(|(rank, p)| {
            vec![
                group.position.short_label().to_string(),
                (rank + 1).to_string(),
                p.id.to_string(),
                p.web_name.clone(),
                p.team_name.clone(),
                num(p.price),
                p.total_points.to_string(),
                num(p.form),
                num(p.points_per_game),
                num(p.score),
            ]
        }));
    }

    let mut value_rows = vec![header(&[
        "ID", "Player", "Team", "Pos", "Price", "Points", "Form", "PPG", "Value",
    ])];
    value_rows.extend(value.players.iter().map(|p| {
        vec![
            p.id.to_string(),
            p.web_name.clone(),
            p.team_name.clone(),
            p.position.short_label().to_string(),
            num(p.price),
            p.total_points.to_string(),
            num(p.form),
            num(p.points_per_game),
            num(p.value_score),
        ]
    }));

    vec![
        Sheet {
            name: "Reliability",
            rows: reliability_rows,
        },
        Sheet {
            name: "Differentials",
            rows: differential_rows,
        },
        Sheet {
            name: "Emerging",
            rows: emerging_rows,
        },
        Sheet {
            name: "Shots",
            rows: shot_rows,
        },
        Sheet {
            name: "TeamShots",
            rows: team_shot_rows,
        },
        Sheet {
            name: "TopPlayers",
            rows: top_rows,
        },
        Sheet {
            name: "Value",
            rows: value_rows,
        },
    ]
}

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn num(value: f64) -> String {
    format!("{value:.2}")
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
