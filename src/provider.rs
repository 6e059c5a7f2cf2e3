use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::api::{self, ApiError};
use crate::config::{AppConfig, ScoringConfig};
use crate::export::export_views_with_progress;
use crate::model::Snapshot;
use crate::state::{Delta, ProviderCommand};

/// Background worker: one command at a time, results flow back as deltas.
/// It keeps the latest snapshot so team reviews, leagues and exports never
/// refetch it.
pub fn spawn_provider(
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    config: AppConfig,
    scoring: ScoringConfig,
) {
    thread::spawn(move || {
        let mut snapshot: Option<Arc<Snapshot>> = None;
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::Initialize => {
                    let _ = tx.send(Delta::Log(format!(
                        "[INFO] Fetching FPL data from {}",
                        config.api_base
                    )));
                    match api::initialize(&config, &scoring) {
                        Ok(fresh) => {
                            if fresh.skipped_records > 0 {
                                let _ = tx.send(Delta::Log(format!(
                                    "[WARN] Skipped {} malformed records",
                                    fresh.skipped_records
                                )));
                            }
                            snapshot = Some(Arc::clone(&fresh));
                            let _ = tx.send(Delta::SetSnapshot(fresh));
                        }
                        Err(err) => {
                            let _ = tx.send(Delta::InitFailed(err.to_string()));
                        }
                    }
                }
                ProviderCommand::FetchTeamReview { manager_id } => {
                    let Some(current) = snapshot.as_ref() else {
                        let _ = tx.send(Delta::TeamReviewFailed {
                            manager_id,
                            message: "data not loaded yet".to_string(),
                        });
                        continue;
                    };
                    match api::team_review(&config, current, &scoring, manager_id) {
                        Ok(review) => {
                            if !review.unknown_picks.is_empty() {
                                let _ = tx.send(Delta::Log(format!(
                                    "[WARN] {} picks not in the current player list",
                                    review.unknown_picks.len()
                                )));
                            }
                            let _ = tx.send(Delta::SetTeamReview(review));
                        }
                        Err(err @ ApiError::NotFound { .. }) => {
                            let _ = tx.send(Delta::TeamReviewFailed {
                                manager_id,
                                message: err.to_string(),
                            });
                        }
                        Err(err) => {
                            let _ = tx.send(Delta::Log(format!("[ERROR] {err}")));
                            let _ = tx.send(Delta::TeamReviewFailed {
                                manager_id,
                                message: "fetch failed, press r to retry".to_string(),
                            });
                        }
                    }
                }
                ProviderCommand::FetchLeague { league_id } => {
                    let Some(current) = snapshot.as_ref() else {
                        let _ = tx.send(Delta::LeagueFailed {
                            league_id,
                            message: "data not loaded yet".to_string(),
                        });
                        continue;
                    };
                    let _ = tx.send(Delta::Log(format!("[INFO] Fetching league {league_id}")));
                    match api::mini_league(&config, current, &scoring, league_id) {
                        Ok(league) => {
                            if !league.failed_managers.is_empty() {
                                let _ = tx.send(Delta::Log(format!(
                                    "[WARN] League {league_id}: no squad or history for {} managers",
                                    league.failed_managers.len()
                                )));
                            }
                            let _ = tx.send(Delta::SetLeague(league));
                        }
                        Err(err @ (ApiError::NotFound { .. } | ApiError::NoGameweek)) => {
                            let _ = tx.send(Delta::LeagueFailed {
                                league_id,
                                message: err.to_string(),
                            });
                        }
                        Err(err) => {
                            let _ = tx.send(Delta::Log(format!("[ERROR] {err}")));
                            let _ = tx.send(Delta::LeagueFailed {
                                league_id,
                                message: "fetch failed, press Enter to retry".to_string(),
                            });
                        }
                    }
                }
                ProviderCommand::Export { path } => {
                    let Some(current) = snapshot.clone() else {
                        let _ = tx.send(Delta::Log(
                            "[WARN] Export skipped: data not loaded yet".to_string(),
                        ));
                        continue;
                    };
                    run_export(&tx, &path, &current, &scoring);
                }
            }
        }
    });
}

fn run_export(tx: &Sender<Delta>, path: &str, snapshot: &Snapshot, scoring: &ScoringConfig) {
    let _ = tx.send(Delta::ExportStarted {
        path: path.to_string(),
        total: 0,
    });
    let report = export_views_with_progress(Path::new(path), snapshot, scoring, |progress| {
        let _ = tx.send(Delta::ExportProgress {
            current: progress.current,
            total: progress.total,
            message: progress.message,
        });
    });
    match report {
        Ok(report) => {
            let _ = tx.send(Delta::ExportFinished {
                path: path.to_string(),
                sheets: report.sheets,
                rows: report.rows,
                errors: 0,
            });
        }
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Export failed: {err:#}")));
            let _ = tx.send(Delta::ExportFinished {
                path: path.to_string(),
                sheets: 0,
                rows: 0,
                errors: 1,
            });
        }
    }
}
