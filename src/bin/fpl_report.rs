use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;

use fpl_terminal::api::{self, MiniLeagueView, SearchQuery, SortKey};
use fpl_terminal::config::{AppConfig, ScoringConfig};
use fpl_terminal::export::export_views_with_progress;
use fpl_terminal::mini_league::{HeadToHead, LeagueRecommendations};
use fpl_terminal::model::{Position, Snapshot};

const USAGE: &str = "usage: fpl_report <view> [args] [--export <path>]
views:
  init
  reliability
  differentials [--limit N]
  emerging [--limit N]
  shots
  top-players [--limit N]
  value [--position POS] [--limit N]
  search [--q TEXT] [--position POS] [--min-price X] [--max-price X] [--sort KEY] [--limit N]
  player <id>
  replacements <id> [--max-price X] [--limit N]
  team <manager_id>
  league [<league_id>] [--compare A,B] [--manager ID]";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let view = args.first().filter(|a| !a.starts_with("--")).cloned();
    let export_path = flag_value(&args, "export").map(PathBuf::from);
    if view.is_none() && export_path.is_none() {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let config = AppConfig::from_env();
    let scoring = ScoringConfig::load()?;
    let snapshot = api::initialize(&config, &scoring)?;
    if snapshot.skipped_records > 0 {
        eprintln!("warning: skipped {} malformed records", snapshot.skipped_records);
    }

    if let Some(view) = view.as_deref() {
        let limit = flag_parse::<usize>(&args, "limit")?;
        let outcome = match view {
            "init" => print_json(&api::init_summary(&snapshot)),
            "reliability" => print_json(&api::team_reliability(&snapshot, &scoring)),
            "differentials" => print_json(&api::differentials(&snapshot, &scoring, limit)),
            "emerging" => print_json(&api::emerging(&snapshot, &scoring, limit)),
            "shots" => print_json(&api::shots(&snapshot, &scoring)),
            "top-players" => print_json(&api::top_players(&snapshot, &scoring, limit)),
            "value" => {
                let position = flag_position(&args)?;
                print_json(&api::value(&snapshot, &scoring, position, limit))
            }
            "search" => {
                let sort = match flag_value(&args, "sort") {
                    Some(raw) => {
                        SortKey::from_label(&raw).ok_or_else(|| anyhow!("unknown sort key: {raw}"))?
                    }
                    None => SortKey::default(),
                };
                let query = SearchQuery {
                    text: flag_value(&args, "q").unwrap_or_default(),
                    position: flag_position(&args)?,
                    min_price: flag_parse(&args, "min-price")?,
                    max_price: flag_parse(&args, "max-price")?,
                    sort,
                    limit,
                };
                print_json(&api::search(&snapshot, &scoring, &query))
            }
            "player" => {
                let id = positional_id(&args)?;
                match api::player_detail(&snapshot, &scoring, id) {
                    Ok(view) => print_json(&view),
                    Err(err) => Err(err.into()),
                }
            }
            "replacements" => {
                let id = positional_id(&args)?;
                let max_price = flag_parse(&args, "max-price")?;
                match api::replacements(&snapshot, &scoring, id, max_price, limit) {
                    Ok(view) => print_json(&view),
                    Err(err) => Err(err.into()),
                }
            }
            "team" => {
                let manager_id = positional_id(&args)?;
                match api::team_review(&config, &snapshot, &scoring, manager_id) {
                    Ok(review) => print_json(&review),
                    Err(err) => Err(err.into()),
                }
            }
            "league" => league_report(&args, &config, &snapshot, &scoring),
            other => {
                eprintln!("unknown view: {other}\n{USAGE}");
                std::process::exit(2);
            }
        };
        if let Err(err) = outcome {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }

    if let Some(path) = export_path {
        let report = export_views_with_progress(&path, &snapshot, &scoring, |progress| {
            eprintln!("[{}/{}] {}", progress.current, progress.total, progress.message);
        })?;
        eprintln!(
            "Exported {} sheets ({} rows) to {}",
            report.sheets,
            report.rows,
            path.display()
        );
    }

    Ok(())
}

#[derive(Serialize)]
struct LeagueReport {
    #[serde(flatten)]
    view: MiniLeagueView,
    #[serde(skip_serializing_if = "Option::is_none")]
    head_to_head: Option<HeadToHead>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendations: Option<LeagueRecommendations>,
}

/// League id from the argument, else `FPL_LEAGUE_ID`; recommendations for
/// `--manager`, else `FPL_MANAGER_ID` when that manager is in the league.
fn league_report(
    args: &[String],
    config: &AppConfig,
    snapshot: &Snapshot,
    scoring: &ScoringConfig,
) -> Result<()> {
    let league_id = match args.get(1).filter(|a| !a.starts_with("--")) {
        Some(_) => positional_id(args)?,
        None => config
            .league_id
            .ok_or_else(|| anyhow!("missing league id (argument or FPL_LEAGUE_ID)"))?,
    };
    let compare = flag_value(args, "compare")
        .map(|raw| -> Result<(u32, u32)> {
            let (a, b) = raw
                .split_once(',')
                .ok_or_else(|| anyhow!("--compare expects A,B"))?;
            let a = a.trim().parse().with_context(|| format!("invalid manager id: {a}"))?;
            let b = b.trim().parse().with_context(|| format!("invalid manager id: {b}"))?;
            Ok((a, b))
        })
        .transpose()?;
    let manager_id = flag_parse::<u32>(args, "manager")?.or(config.manager_id);

    eprintln!("Fetching league {league_id}");
    let league = api::mini_league(config, snapshot, scoring, league_id)?;
    if !league.failed_managers.is_empty() {
        eprintln!(
            "warning: no squad or history for managers {:?}",
            league.failed_managers
        );
    }
    let head_to_head = compare
        .map(|(a, b)| api::head_to_head(snapshot, &league, a, b))
        .transpose()?;
    let recommendations = match manager_id {
        Some(id) if league.manager(id).is_some() => {
            Some(api::league_recommendations(snapshot, scoring, &league, id)?)
        }
        _ => None,
    };
    print_json(&LeagueReport {
        view: api::mini_league_view(snapshot, scoring, &league),
        head_to_head,
        recommendations,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize view")?;
    println!("{out}");
    Ok(())
}

/// Accepts both `--name=value` and `--name value`.
fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    let bare = format!("--{name}");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if *arg == bare {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn flag_parse<T>(args: &[String], name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    flag_value(args, name)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("invalid --{name} value: {raw}"))
        })
        .transpose()
}

fn flag_position(args: &[String]) -> Result<Option<Position>> {
    flag_value(args, "position")
        .map(|raw| Position::from_label(&raw).ok_or_else(|| anyhow!("unknown position: {raw}")))
        .transpose()
}

fn positional_id(args: &[String]) -> Result<u32> {
    let Some(raw) = args.get(1).filter(|a| !a.starts_with("--")) else {
        bail!("missing id argument\n{USAGE}");
    };
    raw.parse::<u32>()
        .with_context(|| format!("invalid id: {raw}"))
}
