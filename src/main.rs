use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use fpl_terminal::config::{AppConfig, ScoringConfig};
use fpl_terminal::metrics::TeamRates;
use fpl_terminal::mini_league::LeagueOwnershipRow;
use fpl_terminal::model::Position;
use fpl_terminal::provider::spawn_provider;
use fpl_terminal::rankings::TeamReliabilityRow;
use fpl_terminal::state::{
    AnalyticsTab, AnalyticsViews, AppState, Delta, InputMode, ProviderCommand, Screen, apply_delta,
};

struct App {
    state: AppState,
    config: AppConfig,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(
        config: AppConfig,
        scoring: ScoringConfig,
        cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    ) -> Self {
        Self {
            state: AppState::new(scoring, config.manager_id).with_league_id(config.league_id),
            config,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.input_mode != InputMode::Normal {
            self.on_input_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.state.screen = Screen::Analytics,
            KeyCode::Char('2') => {
                self.state.screen = Screen::Transfers;
                self.state.clamp_selection();
            }
            KeyCode::Char('3') => {
                self.state.screen = Screen::Search;
                if self.state.search_results.is_none() {
                    self.state.refresh_search();
                }
            }
            KeyCode::Char('4') => {
                self.state.screen = Screen::League;
                self.state.clamp_selection();
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Tab | KeyCode::Char('t') if self.state.screen == Screen::Analytics => {
                self.state.cycle_analytics_tab();
            }
            KeyCode::Char('p') => match self.state.screen {
                Screen::Analytics if self.state.analytics_tab == AnalyticsTab::TopPlayers => {
                    self.state.cycle_top_players_position();
                }
                Screen::Analytics if self.state.analytics_tab == AnalyticsTab::Value => {
                    self.state.cycle_value_position();
                }
                Screen::Search => self.state.cycle_search_position(),
                _ => {}
            },
            KeyCode::Char('s') if self.state.screen == Screen::Search => {
                self.state.cycle_search_sort();
            }
            KeyCode::Char('/') if self.state.screen == Screen::Search => {
                self.state.input_mode = InputMode::SearchText;
            }
            KeyCode::Char('m') if self.state.screen == Screen::Transfers => {
                self.state.input_mode = InputMode::ManagerId;
            }
            KeyCode::Enter if self.state.screen == Screen::Transfers => self.request_team_review(),
            KeyCode::Char('l') if self.state.screen == Screen::League => {
                self.state.input_mode = InputMode::LeagueId;
            }
            KeyCode::Enter if self.state.screen == Screen::League => self.request_league(),
            KeyCode::Char('c') if self.state.screen == Screen::League => {
                self.state.toggle_league_pin();
            }
            KeyCode::Char('r') => self.request_initialize(),
            KeyCode::Char('e') => self.request_export(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn on_input_key(&mut self, key: KeyEvent) {
        let mode = self.state.input_mode;
        match key.code {
            KeyCode::Esc => self.state.input_mode = InputMode::Normal,
            KeyCode::Enter => {
                self.state.input_mode = InputMode::Normal;
                match mode {
                    InputMode::ManagerId => self.request_team_review(),
                    InputMode::SearchText => self.state.refresh_search(),
                    InputMode::LeagueId => self.request_league(),
                    InputMode::Normal => {}
                }
            }
            KeyCode::Backspace => match mode {
                InputMode::ManagerId => {
                    self.state.manager_input.pop();
                }
                InputMode::SearchText => {
                    self.state.search_query.text.pop();
                    self.state.refresh_search();
                }
                InputMode::LeagueId => {
                    self.state.league_input.pop();
                }
                InputMode::Normal => {}
            },
            KeyCode::Char(c) => match mode {
                InputMode::ManagerId if c.is_ascii_digit() => self.state.manager_input.push(c),
                InputMode::LeagueId if c.is_ascii_digit() => self.state.league_input.push(c),
                InputMode::SearchText => {
                    self.state.search_query.text.push(c);
                    self.state.refresh_search();
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[INFO] {what} unavailable"));
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
            return false;
        }
        true
    }

    fn request_initialize(&mut self) {
        if self.state.loading {
            return;
        }
        if self.send(ProviderCommand::Initialize, "Initialization") {
            self.state.loading = true;
        }
    }

    fn request_team_review(&mut self) {
        let Some(manager_id) = self.state.manager_id() else {
            self.state
                .push_log("[INFO] Enter a manager id first (press m)");
            return;
        };
        if self.state.snapshot.is_none() {
            self.state.push_log("[INFO] Data still loading");
            return;
        }
        if self.send(ProviderCommand::FetchTeamReview { manager_id }, "Team review") {
            self.state.review_loading = true;
            self.state
                .push_log(format!("[INFO] Fetching squad for manager {manager_id}"));
        }
    }

    fn request_league(&mut self) {
        let Some(league_id) = self.state.league_id() else {
            self.state.push_log("[INFO] Enter a league id first (press l)");
            return;
        };
        if self.state.snapshot.is_none() {
            self.state.push_log("[INFO] Data still loading");
            return;
        }
        if self.state.league_loading {
            return;
        }
        if self.send(ProviderCommand::FetchLeague { league_id }, "League") {
            self.state.league_loading = true;
        }
    }

    fn request_export(&mut self) {
        if self.state.export.active && !self.state.export.done {
            return;
        }
        let path = self.config.export_path.display().to_string();
        if self.send(ProviderCommand::Export { path: path.clone() }, "Export") {
            self.state.push_log(format!("[INFO] Exporting views to {path}"));
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = AppConfig::from_env();
    let scoring = match ScoringConfig::load() {
        Ok(scoring) => scoring,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(tx, cmd_rx, config.clone(), scoring.clone());

    let mut app = App::new(config, scoring, Some(cmd_tx));
    app.request_initialize();
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.state.maybe_clear_export(Instant::now());

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let state = &app.state;
    if state.snapshot.is_none() {
        let msg = if state.loading {
            "Loading FPL data..."
        } else {
            "No data loaded. Press r to retry."
        };
        frame.render_widget(
            Paragraph::new(msg).style(Style::default().fg(Color::DarkGray)),
            chunks[1],
        );
    } else {
        match state.screen {
            Screen::Analytics => render_analytics(frame, chunks[1], state),
            Screen::Transfers => render_transfers(frame, chunks[1], state),
            Screen::Search => render_search(frame, chunks[1], state),
            Screen::League => render_league(frame, chunks[1], state),
        }
    }

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::TOP));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(state));
    frame.render_widget(footer, chunks[3]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let screen = match state.screen {
        Screen::Analytics => "ANALYTICS",
        Screen::Transfers => "TRANSFERS",
        Screen::Search => "SEARCH",
        Screen::League => "LEAGUE",
    };
    let data = match state.snapshot.as_ref() {
        Some(s) => format!(
            "GW played {} | target GW{} | {} players | fetched {}",
            s.gameweeks.played,
            s.gameweeks.target,
            s.players.len(),
            s.fetched_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None if state.loading => "loading...".to_string(),
        None => "no data".to_string(),
    };
    let export = if state.export.active {
        format!(
            " | export {}/{} {}",
            state.export.current, state.export.total, state.export.message
        )
    } else {
        String::new()
    };
    format!(" FPL TERMINAL | {screen} | {data}{export}\n")
}

fn footer_text(state: &AppState) -> String {
    if state.input_mode != InputMode::Normal {
        return "Type | Enter Submit | Backspace Delete | Esc Cancel".to_string();
    }
    match state.screen {
        Screen::Analytics => {
            "1-4 Screens | Tab Next view | j/k Move | p Position | r Reload | e Export | ? Help | q Quit".to_string()
        }
        Screen::Transfers => {
            "1-4 Screens | m Manager id | Enter Review | j/k Select player | r Reload | ? Help | q Quit".to_string()
        }
        Screen::Search => {
            "1-4 Screens | / Query | s Sort | p Position | j/k Move | r Reload | ? Help | q Quit".to_string()
        }
        Screen::League => {
            "1-4 Screens | l League id | Enter Load | j/k Move | c Pin/compare | r Reload | ? Help | q Quit".to_string()
        }
    }
}

struct Column {
    title: &'static str,
    width: Constraint,
}

const fn col(title: &'static str, width: u16) -> Column {
    Column {
        title,
        width: Constraint::Length(width),
    }
}

/// One line per row; an empty `rows` renders `empty_msg` instead.
fn render_table(
    frame: &mut Frame,
    area: Rect,
    columns: &[Column],
    rows: &[Vec<String>],
    selected: Option<usize>,
    empty_msg: &str,
) {
    if area.height < 2 {
        return;
    }
    let widths: Vec<Constraint> = columns.iter().map(|c| c.width).collect();
    let header_area = Rect { height: 1, ..area };
    let header_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths.clone())
        .split(header_area);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    for (idx, column) in columns.iter().enumerate() {
        render_cell_text(frame, header_cols[idx], column.title, bold);
    }

    let list_area = Rect {
        y: area.y + 1,
        height: area.height - 1,
        ..area
    };
    if rows.is_empty() {
        let empty = Paragraph::new(empty_msg).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
        return;
    }

    let (start, end) = visible_range(selected.unwrap_or(0), rows.len(), list_area.height as usize);
    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            y: list_area.y + i as u16,
            height: 1,
            ..list_area
        };
        let is_selected = selected == Some(idx);
        let style = if is_selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if is_selected {
            frame.render_widget(Block::default().style(style), row_area);
        }
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths.clone())
            .split(row_area);
        for (c, value) in rows[idx].iter().enumerate().take(cols.len()) {
            render_cell_text(frame, cols[c], value, style);
        }
    }
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let text_area = Rect {
        x: area.x,
        y: area.y + (area.height / 2),
        width: area.width,
        height: 1,
    };
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, text_area);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn num(value: f64) -> String {
    format!("{value:.2}")
}

/// Horizontal bars, scaled by 100 since bar values are integers. Negative
/// scores draw as empty bars but keep their printed value.
fn score_bar_chart<'a>(title: &'a str, entries: &[(String, f64)]) -> BarChart<'a> {
    let bars: Vec<Bar> = entries
        .iter()
        .map(|(label, score)| {
            Bar::default()
                .value((score.max(0.0) * 100.0).round() as u64)
                .label(Line::from(label.clone()))
                .text_value(format!("{score:.1}"))
                .style(Style::default().fg(Color::Green))
        })
        .collect();
    BarChart::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
}

fn render_analytics(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let tabs = AnalyticsTab::ALL
        .iter()
        .map(|tab| {
            if *tab == state.analytics_tab {
                format!("[{}]", tab.label())
            } else {
                format!(" {} ", tab.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    frame.render_widget(Paragraph::new(tabs), sections[0]);

    let Some(views) = state.views.as_ref() else {
        return;
    };
    let body = sections[1];
    let selected = Some(state.selected);
    match state.analytics_tab {
        AnalyticsTab::Reliability => {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(67), Constraint::Length(34)])
                .split(body);
            let rows: Vec<Vec<String>> = views
                .reliability
                .teams
                .iter()
                .map(|t| {
                    vec![
                        t.short_name.clone(),
                        t.matches_played.to_string(),
                        num(t.rates.xga_per_90),
                        num(t.rates.xg_per_90),
                        format!("{:.0}%", t.rates.clean_sheet_rate * 100.0),
                        num(t.rates.shots_faced_per_90),
                        num(t.rates.shots_per_90),
                        format!("{:+.2}", t.rates.defensive_efficiency),
                        format!("{:+.2}", t.rates.offensive_efficiency),
                    ]
                })
                .collect();
            render_table(
                frame,
                cols[0],
                &[
                    col("Team", 6),
                    col("MP", 4),
                    col("xGA/90", 8),
                    col("xG/90", 7),
                    col("CS%", 6),
                    col("SF/90", 7),
                    col("Sh/90", 7),
                    col("DefEff", 8),
                    col("OffEff", 8),
                ],
                &rows,
                selected,
                "No teams found",
            );
            let side = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(cols[1]);
            frame.render_widget(
                Paragraph::new(ranked_team_lines(&views.reliability.best_defense, |r| r.xga_per_90))
                    .block(Block::default().title("Best defense (xGA/90)").borders(Borders::ALL)),
                side[0],
            );
            frame.render_widget(
                Paragraph::new(ranked_team_lines(&views.reliability.best_attack, |r| r.xg_per_90))
                    .block(Block::default().title("Best attack (xG/90)").borders(Borders::ALL)),
                side[1],
            );
        }
        AnalyticsTab::Differentials => {
            let rows: Vec<Vec<String>> = views
                .differentials
                .players
                .iter()
                .map(|p| {
                    vec![
                        p.web_name.clone(),
                        p.team_name.clone(),
                        p.position.short_label().to_string(),
                        format!("£{:.1}", p.price),
                        num(p.points_per_90),
                        num(p.xgi_per_90),
                        format!("{:.1}", p.form),
                        format!("{:.1}%", p.ownership_percent),
                        num(p.differential_score),
                    ]
                })
                .collect();
            render_table(
                frame,
                body,
                &player_columns("Pts/90", "xGI/90"),
                &rows,
                selected,
                "No differentials found",
            );
        }
        AnalyticsTab::Emerging => {
            let rows: Vec<Vec<String>> = views
                .emerging
                .players
                .iter()
                .map(|p| {
                    vec![
                        p.web_name.clone(),
                        p.team_name.clone(),
                        p.position.short_label().to_string(),
                        format!("£{:.1}", p.price),
                        num(p.points_per_90),
                        format!("{:.0}", p.minutes_per_gameweek),
                        format!("{:.1}", p.form),
                        format!("{:.1}%", p.ownership_percent),
                        num(p.emergence_score),
                    ]
                })
                .collect();
            render_table(
                frame,
                body,
                &player_columns("Pts/90", "Min/GW"),
                &rows,
                selected,
                "No emerging players found",
            );
        }
        AnalyticsTab::Shots => render_shots(frame, body, state, views),
        AnalyticsTab::TopPlayers => {
            let players = views
                .top_players
                .positions
                .iter()
                .find(|g| g.position == state.top_players_position)
                .map(|g| g.players.as_slice())
                .unwrap_or(&[]);
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(body);
            let rows: Vec<Vec<String>> = players
                .iter()
                .map(|p| {
                    vec![
                        p.web_name.clone(),
                        p.team_name.clone(),
                        format!("£{:.1}", p.price),
                        p.total_points.to_string(),
                        format!("{:.1}", p.form),
                        format!("{:.1}", p.points_per_game),
                        num(p.score),
                    ]
                })
                .collect();
            render_table(
                frame,
                cols[0],
                &[
                    col("Player", 16),
                    col("Team", 14),
                    col("Price", 7),
                    col("Pts", 5),
                    col("Form", 6),
                    col("PPG", 6),
                    col("Score", 7),
                ],
                &rows,
                selected,
                "No players found",
            );
            let entries: Vec<(String, f64)> =
                players.iter().map(|p| (p.web_name.clone(), p.score)).collect();
            let title = format!("Top {} (p: position)", state.top_players_position.short_label());
            frame.render_widget(score_bar_chart(&title, &entries), cols[1]);
        }
        AnalyticsTab::Value => {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(body);
            let rows: Vec<Vec<String>> = views
                .value
                .players
                .iter()
                .map(|p| {
                    vec![
                        p.web_name.clone(),
                        p.team_name.clone(),
                        p.position.short_label().to_string(),
                        format!("£{:.1}", p.price),
                        format!("{:.1}", p.points_per_game),
                        format!("{:.1}", p.form),
                        num(p.value_score),
                    ]
                })
                .collect();
            render_table(
                frame,
                cols[0],
                &[
                    col("Player", 16),
                    col("Team", 14),
                    col("Pos", 5),
                    col("Price", 7),
                    col("PPG", 6),
                    col("Form", 6),
                    col("Value", 7),
                ],
                &rows,
                selected,
                "No players found",
            );
            let entries: Vec<(String, f64)> = views
                .value
                .players
                .iter()
                .map(|p| (p.web_name.clone(), p.value_score))
                .collect();
            let title = format!(
                "Value: {} (p: position)",
                state.value_position.map(Position::short_label).unwrap_or("ALL")
            );
            frame.render_widget(score_bar_chart(&title, &entries), cols[1]);
        }
    }
}

fn ranked_team_lines(rows: &[TeamReliabilityRow], pick: fn(&TeamRates) -> f64) -> String {
    rows.iter()
        .map(|t| format!("{:<14} {:.2}", t.name, pick(&t.rates)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn player_columns(metric_a: &'static str, metric_b: &'static str) -> [Column; 9] {
    [
        col("Player", 16),
        col("Team", 14),
        col("Pos", 5),
        col("Price", 7),
        col(metric_a, 8),
        col(metric_b, 8),
        col("Form", 6),
        col("Owned", 7),
        col("Score", 7),
    ]
}

fn render_shots(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    views: &AnalyticsViews,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let rows: Vec<Vec<String>> = views
        .shots
        .players
        .iter()
        .map(|p| {
            vec![
                p.web_name.clone(),
                p.team_name.clone(),
                p.position.short_label().to_string(),
                num(p.shots_per_90),
                num(p.shots_on_target_per_90),
                num(p.xg_per_90),
                p.goals_scored.to_string(),
            ]
        })
        .collect();
    render_table(
        frame,
        cols[0],
        &[
            col("Player", 16),
            col("Team", 14),
            col("Pos", 5),
            col("Sh/90", 7),
            col("SoT/90", 7),
            col("xG/90", 7),
            col("G", 4),
        ],
        &rows,
        Some(state.selected),
        "No shooters found",
    );

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(1)])
        .split(cols[1]);
    let by_position = views
        .shots
        .positions
        .iter()
        .map(|p| {
            format!(
                "{}  sh/90 {:.2}  sot/90 {:.2}  xG/90 {:.2}",
                p.position.short_label(),
                p.avg_shots_per_90,
                p.avg_shots_on_target_per_90,
                p.avg_xg_per_90
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    frame.render_widget(
        Paragraph::new(by_position).block(Block::default().title("By position").borders(Borders::ALL)),
        side[0],
    );
    let by_team = views
        .shots
        .teams
        .iter()
        .map(|t| format!("{:<14} {:.2} sh  {:.2} xG", t.team_name, t.shots_per_match, t.xg_per_match))
        .collect::<Vec<_>>()
        .join("\n");
    frame.render_widget(
        Paragraph::new(by_team).block(Block::default().title("By team (per match)").borders(Borders::ALL)),
        side[1],
    );
}

fn render_transfers(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(area);

    let cursor = if state.input_mode == InputMode::ManagerId { "_" } else { "" };
    let mut top = format!("Manager id: {}{cursor}", state.manager_input);
    if state.review_loading {
        top.push_str("  (loading...)");
    }
    if let Some(review) = state.review.as_ref() {
        let s = &review.summary;
        top.push_str(&format!(
            "\nGW{} | value £{:.1} | points {} | avg form {:.2} | avg PPG {:.2} | {} with issues",
            review.gameweek, s.total_value, s.total_points, s.avg_form, s.avg_ppg, s.players_with_issues
        ));
    }
    frame.render_widget(Paragraph::new(top), sections[0]);

    let Some(review) = state.review.as_ref() else {
        frame.render_widget(
            Paragraph::new("No squad loaded. Press m, type a manager id, then Enter.")
                .style(Style::default().fg(Color::DarkGray)),
            sections[1],
        );
        return;
    };

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(sections[1]);
    let rows: Vec<Vec<String>> = review
        .players
        .iter()
        .map(|p| {
            let armband = if p.is_captain {
                "C"
            } else if p.is_vice_captain {
                "V"
            } else {
                ""
            };
            vec![
                p.slot.to_string(),
                format!("{} {armband}", p.web_name),
                p.position.short_label().to_string(),
                format!("£{:.1}", p.price),
                format!("{:.1}", p.form),
                p.total_points.to_string(),
                if p.has_issues {
                    format!("{} (p{})", p.issues.len(), p.priority)
                } else {
                    "-".to_string()
                },
            ]
        })
        .collect();
    render_table(
        frame,
        cols[0],
        &[
            col("#", 3),
            col("Player", 18),
            col("Pos", 5),
            col("Price", 7),
            col("Form", 6),
            col("Pts", 5),
            col("Issues", 8),
        ],
        &rows,
        Some(state.squad_selected),
        "Squad is empty",
    );

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(cols[1]);
    let issues = match state.selected_review_player() {
        Some(p) if p.issues.is_empty() => format!("{}: no issues", p.web_name),
        Some(p) => p
            .issues
            .iter()
            .map(|i| format!("[{:?}] {}", i.severity, i.message))
            .collect::<Vec<_>>()
            .join("\n"),
        None => String::new(),
    };
    frame.render_widget(
        Paragraph::new(issues).block(Block::default().title("Issues").borders(Borders::ALL)),
        side[0],
    );

    let replacements = match state.replacements.as_ref() {
        Some(view) if view.candidates.is_empty() => {
            format!("No replacements up to £{:.1}", view.max_price)
        }
        Some(view) => view
            .candidates
            .iter()
            .map(|c| {
                format!(
                    "{:<14} {:<12} £{:.1} form {:.1} score {:.1}",
                    c.web_name, c.team_name, c.price, c.form, c.replacement_score
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        None => String::new(),
    };
    let title = state
        .replacements
        .as_ref()
        .map(|v| format!("Replace {} (≤ £{:.1})", v.outgoing_name, v.max_price))
        .unwrap_or_else(|| "Replacements".to_string());
    frame.render_widget(
        Paragraph::new(replacements).block(Block::default().title(title).borders(Borders::ALL)),
        side[1],
    );
}

fn render_search(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let cursor = if state.input_mode == InputMode::SearchText { "_" } else { "" };
    let query = &state.search_query;
    frame.render_widget(
        Paragraph::new(format!(
            "Query: {}{cursor} | Position: {} | Sort: {}",
            query.text,
            query.position.map(Position::short_label).unwrap_or("ALL"),
            query.sort.label()
        )),
        sections[0],
    );

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(sections[1]);
    let rows: Vec<Vec<String>> = state
        .search_results
        .as_ref()
        .map(|r| {
            r.players
                .iter()
                .map(|p| {
                    vec![
                        p.web_name.clone(),
                        p.team_name.clone(),
                        p.position.short_label().to_string(),
                        format!("£{:.1}", p.price),
                        p.total_points.to_string(),
                        format!("{:.1}", p.form),
                        p.value_score.map(num).unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect()
        })
        .unwrap_or_default();
    render_table(
        frame,
        cols[0],
        &[
            col("Player", 16),
            col("Team", 14),
            col("Pos", 5),
            col("Price", 7),
            col("Pts", 5),
            col("Form", 6),
            col("Value", 7),
        ],
        &rows,
        Some(state.search_selected),
        "No players match",
    );

    let detail = match state.search_detail.as_ref() {
        Some(d) => {
            let p = &d.player;
            let chance = p
                .chance_of_playing_next_round
                .map(|c| format!(" ({c}%)"))
                .unwrap_or_default();
            let mut lines = vec![
                format!("{} ({})", p.full_name, p.web_name),
                format!("{} | {} | £{:.1}", d.team_name, p.position.short_label(), p.price),
                format!("Status: {}{chance}", d.availability),
                format!("Points {} | PPG {:.1} | Form {:.1}", p.total_points, p.points_per_game, p.form),
                format!("Minutes {} | Games {}", p.minutes, p.games_played),
                format!("Goals {} | Assists {} | CS {} | Bonus {}", p.goals_scored, p.assists, p.clean_sheets, p.bonus),
                format!("xG/90 {:.2} | xA/90 {:.2} | Pts/90 {:.2}", d.rates.xg_per_90, d.rates.xa_per_90, d.rates.points_per_90),
                format!("Owned {:.1}%", p.ownership_percent),
            ];
            if let Some(value) = d.value_score {
                lines.push(format!("Value score {value:.1}"));
            }
            if let Some(minutes) = d.last_gameweek_minutes {
                lines.push(format!("Last GW minutes {minutes}"));
            }
            if !p.news.is_empty() {
                lines.push(format!("News: {}", p.news));
            }
            lines.join("\n")
        }
        None => String::new(),
    };
    frame.render_widget(
        Paragraph::new(detail).block(Block::default().title("Player").borders(Borders::ALL)),
        cols[1],
    );
}

fn render_league(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let cursor = if state.input_mode == InputMode::LeagueId { "_" } else { "" };
    let mut top = format!("League id: {}{cursor}", state.league_input);
    if state.league_loading {
        top.push_str("  (loading...)");
    }
    if let Some(view) = state.league_view.as_ref() {
        top.push_str(&format!(
            " | {} | GW{} | {} managers, {} squads",
            view.name, view.gameweek, view.managers, view.squads_fetched
        ));
    }
    frame.render_widget(Paragraph::new(top), sections[0]);

    let Some(view) = state.league_view.as_ref() else {
        frame.render_widget(
            Paragraph::new("No league loaded. Press l, type a league id, then Enter.")
                .style(Style::default().fg(Color::DarkGray)),
            sections[1],
        );
        return;
    };

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(sections[1]);
    let rows: Vec<Vec<String>> = view
        .standings
        .iter()
        .map(|m| {
            let pin = if state.league_pinned == Some(m.manager_id) { "*" } else { "" };
            vec![
                format!("{}{pin}", m.rank),
                m.entry_name.clone(),
                m.total_points.to_string(),
                format!("{:.1}", m.avg_points),
                format!("{:.1}", m.consistency),
                m.best_gameweek.to_string(),
                m.hits_taken.to_string(),
            ]
        })
        .collect();
    render_table(
        frame,
        cols[0],
        &[
            col("#", 4),
            col("Team", 20),
            col("Pts", 6),
            col("Avg", 6),
            col("Cons", 6),
            col("Best", 5),
            col("Hits", 5),
        ],
        &rows,
        Some(state.league_selected),
        "League has no entries",
    );

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(30),
            Constraint::Percentage(35),
        ])
        .split(cols[1]);
    let differentials = view
        .differentials
        .iter()
        .map(|r| {
            format!(
                "{:<14} league {:>3.0}% global {:>4.1}% x{:.1}",
                r.web_name, r.league_ownership_percent, r.global_ownership_percent, r.differential_score
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    frame.render_widget(
        Paragraph::new(differentials)
            .block(Block::default().title("League differentials").borders(Borders::ALL)),
        side[0],
    );
    let entries: Vec<(String, f64)> = view
        .captains
        .iter()
        .map(|r| (r.web_name.clone(), r.captain_count as f64))
        .collect();
    frame.render_widget(score_bar_chart("Captains", &entries), side[1]);

    let compare = match (state.head_to_head.as_ref(), state.league_pinned) {
        (Some(h2h), _) => {
            let mut lines = vec![
                format!(
                    "{} vs {}: {:+} pts",
                    h2h.first.entry_name, h2h.second.entry_name, h2h.points_gap
                ),
                format!("Shared: {}", h2h.shared_players.join(", ")),
                format!("Only {}: {}", h2h.first.entry_name, h2h.only_first.join(", ")),
                format!("Only {}: {}", h2h.second.entry_name, h2h.only_second.join(", ")),
            ];
            if let Some(last) = h2h.progression.last() {
                lines.push(format!(
                    "GW{}: {} vs {}",
                    last.event,
                    last.first_points.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                    last.second_points.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
                ));
            }
            lines.join("\n")
        }
        (None, Some(_)) => "Select another manager to compare".to_string(),
        (None, None) => match state.league_recommendations.as_ref() {
            Some(recs) => {
                let names = |rows: &[LeagueOwnershipRow]| {
                    rows.iter().map(|r| r.web_name.clone()).collect::<Vec<_>>().join(", ")
                };
                format!(
                    "Targets: {}\nMust haves: {}\nUnique: {}",
                    names(&recs.targets),
                    names(&recs.must_haves),
                    names(&recs.unique)
                )
            }
            None => "c pins a manager for head to head".to_string(),
        },
    };
    frame.render_widget(
        Paragraph::new(compare).block(Block::default().title("Compare").borders(Borders::ALL)),
        side[2],
    );
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "FPL Terminal - Help",
        "",
        "Global:",
        "  1 / 2 / 3 / 4  Analytics / Transfers / Search / League",
        "  j/k or ↑/↓   Move selection",
        "  r            Reload data",
        "  e            Export views to xlsx",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Analytics:",
        "  Tab / t      Next view",
        "  p            Cycle position (Top Players, Value)",
        "",
        "Transfers:",
        "  m            Edit manager id",
        "  Enter        Review squad",
        "",
        "Search:",
        "  /            Edit query",
        "  s            Cycle sort",
        "  p            Cycle position filter",
        "",
        "League:",
        "  l            Edit league id",
        "  Enter        Load league",
        "  c            Pin selected manager / compare",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
