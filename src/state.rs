use std::collections::VecDeque;
use std::sync::Arc;

use crate::api::{
    self, MiniLeagueView, PlayerDetailView, PlayerListView, ReplacementView, SearchQuery,
    SearchResults, ShotsView, TeamReliabilityView, TopPlayersView, ValueView,
};
use crate::config::ScoringConfig;
use crate::mini_league::{HeadToHead, LeagueRecommendations, ManagerPerformance};
use crate::model::{MiniLeague, Position, Snapshot};
use crate::rankings::{DifferentialRow, EmergingRow};
use crate::team_review::{PlayerReview, SquadReview};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Analytics,
    Transfers,
    Search,
    League,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsTab {
    Reliability,
    Differentials,
    Emerging,
    Shots,
    TopPlayers,
    Value,
}

impl AnalyticsTab {
    pub const ALL: [AnalyticsTab; 6] = [
        AnalyticsTab::Reliability,
        AnalyticsTab::Differentials,
        AnalyticsTab::Emerging,
        AnalyticsTab::Shots,
        AnalyticsTab::TopPlayers,
        AnalyticsTab::Value,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AnalyticsTab::Reliability => "Reliability",
            AnalyticsTab::Differentials => "Differentials",
            AnalyticsTab::Emerging => "Emerging",
            AnalyticsTab::Shots => "Shots",
            AnalyticsTab::TopPlayers => "Top Players",
            AnalyticsTab::Value => "Value",
        }
    }
}

/// Which text field, if any, is capturing keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    ManagerId,
    SearchText,
    LeagueId,
}

/// Every analytics view, derived once per snapshot.
#[derive(Debug, Clone)]
pub struct AnalyticsViews {
    pub reliability: TeamReliabilityView,
    pub differentials: PlayerListView<DifferentialRow>,
    pub emerging: PlayerListView<EmergingRow>,
    pub shots: ShotsView,
    pub top_players: TopPlayersView,
    pub value: ValueView,
}

impl AnalyticsViews {
    pub fn build(snapshot: &Snapshot, scoring: &ScoringConfig, value_position: Option<Position>) -> Self {
        Self {
            reliability: api::team_reliability(snapshot, scoring),
            differentials: api::differentials(snapshot, scoring, None),
            emerging: api::emerging(snapshot, scoring, None),
            shots: api::shots(snapshot, scoring),
            top_players: api::top_players(snapshot, scoring, None),
            value: api::value(snapshot, scoring, value_position, None),
        }
    }
}

pub struct AppState {
    pub screen: Screen,
    pub analytics_tab: AnalyticsTab,
    pub input_mode: InputMode,
    pub scoring: ScoringConfig,
    pub snapshot: Option<Arc<Snapshot>>,
    pub views: Option<AnalyticsViews>,
    pub loading: bool,
    pub selected: usize,
    pub top_players_position: Position,
    pub value_position: Option<Position>,
    pub manager_input: String,
    pub review: Option<SquadReview>,
    pub review_loading: bool,
    pub squad_selected: usize,
    pub replacements: Option<ReplacementView>,
    pub search_query: SearchQuery,
    pub search_results: Option<SearchResults>,
    pub search_selected: usize,
    pub search_detail: Option<PlayerDetailView>,
    pub league_input: String,
    pub league: Option<MiniLeague>,
    pub league_view: Option<MiniLeagueView>,
    pub league_loading: bool,
    pub league_selected: usize,
    /// Manager the selected row is compared against.
    pub league_pinned: Option<u32>,
    pub head_to_head: Option<HeadToHead>,
    pub league_recommendations: Option<LeagueRecommendations>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub export: ExportState,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ScoringConfig::default(), None)
    }
}

impl AppState {
    pub fn new(scoring: ScoringConfig, manager_id: Option<u32>) -> Self {
        Self {
            screen: Screen::Analytics,
            analytics_tab: AnalyticsTab::Reliability,
            input_mode: InputMode::Normal,
            scoring,
            snapshot: None,
            views: None,
            loading: false,
            selected: 0,
            top_players_position: Position::Midfielder,
            value_position: None,
            manager_input: manager_id.map(|id| id.to_string()).unwrap_or_default(),
            review: None,
            review_loading: false,
            squad_selected: 0,
            replacements: None,
            search_query: SearchQuery::default(),
            search_results: None,
            search_selected: 0,
            search_detail: None,
            league_input: String::new(),
            league: None,
            league_view: None,
            league_loading: false,
            league_selected: 0,
            league_pinned: None,
            head_to_head: None,
            league_recommendations: None,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
            export: ExportState::new(),
        }
    }

    pub fn with_league_id(mut self, league_id: Option<u32>) -> Self {
        self.league_input = league_id.map(|id| id.to_string()).unwrap_or_default();
        self
    }

    pub fn maybe_clear_export(&mut self, now: std::time::Instant) {
        self.export.clear_if_done_for(now, 8);
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn manager_id(&self) -> Option<u32> {
        self.manager_input.trim().parse::<u32>().ok()
    }

    pub fn league_id(&self) -> Option<u32> {
        self.league_input.trim().parse::<u32>().ok()
    }

    pub fn cycle_analytics_tab(&mut self) {
        let idx = AnalyticsTab::ALL
            .iter()
            .position(|tab| *tab == self.analytics_tab)
            .unwrap_or(0);
        self.analytics_tab = AnalyticsTab::ALL[(idx + 1) % AnalyticsTab::ALL.len()];
        self.selected = 0;
    }

    pub fn cycle_top_players_position(&mut self) {
        self.top_players_position = next_position(self.top_players_position);
        self.selected = 0;
    }

    /// All positions, then each position in turn.
    pub fn cycle_value_position(&mut self) {
        self.value_position = match self.value_position {
            None => Some(Position::Goalkeeper),
            Some(Position::Forward) => None,
            Some(pos) => Some(next_position(pos)),
        };
        self.rebuild_value_view();
        self.selected = 0;
    }

    pub fn cycle_search_sort(&mut self) {
        self.search_query.sort = self.search_query.sort.next();
        self.refresh_search();
    }

    pub fn cycle_search_position(&mut self) {
        self.search_query.position = match self.search_query.position {
            None => Some(Position::Goalkeeper),
            Some(Position::Forward) => None,
            Some(pos) => Some(next_position(pos)),
        };
        self.refresh_search();
    }

    fn rebuild_value_view(&mut self) {
        let (Some(snapshot), Some(views)) = (self.snapshot.as_ref(), self.views.as_mut()) else {
            return;
        };
        views.value = api::value(snapshot, &self.scoring, self.value_position, None);
    }

    /// Row count of whatever list the current screen shows.
    fn visible_rows(&self) -> usize {
        match self.screen {
            Screen::Analytics => {
                let Some(views) = self.views.as_ref() else {
                    return 0;
                };
                match self.analytics_tab {
                    AnalyticsTab::Reliability => views.reliability.teams.len(),
                    AnalyticsTab::Differentials => views.differentials.players.len(),
                    AnalyticsTab::Emerging => views.emerging.players.len(),
                    AnalyticsTab::Shots => views.shots.players.len(),
                    AnalyticsTab::TopPlayers => views
                        .top_players
                        .positions
                        .iter()
                        .find(|group| group.position == self.top_players_position)
                        .map(|group| group.players.len())
                        .unwrap_or(0),
                    AnalyticsTab::Value => views.value.players.len(),
                }
            }
            Screen::Transfers => self.review.as_ref().map(|r| r.players.len()).unwrap_or(0),
            Screen::Search => self
                .search_results
                .as_ref()
                .map(|r| r.players.len())
                .unwrap_or(0),
            Screen::League => self
                .league_view
                .as_ref()
                .map(|v| v.standings.len())
                .unwrap_or(0),
        }
    }

    fn selection_mut(&mut self) -> &mut usize {
        match self.screen {
            Screen::Analytics => &mut self.selected,
            Screen::Transfers => &mut self.squad_selected,
            Screen::Search => &mut self.search_selected,
            Screen::League => &mut self.league_selected,
        }
    }

    pub fn select_next(&mut self) {
        let total = self.visible_rows();
        let selected = self.selection_mut();
        *selected = if total == 0 { 0 } else { (*selected + 1) % total };
        self.on_selection_changed();
    }

    pub fn select_prev(&mut self) {
        let total = self.visible_rows();
        let selected = self.selection_mut();
        *selected = match (total, *selected) {
            (0, _) => 0,
            (_, 0) => total - 1,
            (_, idx) => idx - 1,
        };
        self.on_selection_changed();
    }

    pub fn clamp_selection(&mut self) {
        let total = self.visible_rows();
        let selected = self.selection_mut();
        if total == 0 {
            *selected = 0;
        } else if *selected >= total {
            *selected = total - 1;
        }
    }

    fn on_selection_changed(&mut self) {
        match self.screen {
            Screen::Transfers => self.refresh_replacements(),
            Screen::Search => self.refresh_search_detail(),
            Screen::League => self.refresh_head_to_head(),
            Screen::Analytics => {}
        }
    }

    pub fn selected_review_player(&self) -> Option<&PlayerReview> {
        self.review.as_ref()?.players.get(self.squad_selected)
    }

    pub fn selected_league_manager(&self) -> Option<&ManagerPerformance> {
        self.league_view.as_ref()?.standings.get(self.league_selected)
    }

    /// Pins the selected manager, or unpins when the pinned row is selected.
    pub fn toggle_league_pin(&mut self) {
        let Some(selected) = self.selected_league_manager().map(|m| m.manager_id) else {
            return;
        };
        self.league_pinned = if self.league_pinned == Some(selected) {
            None
        } else {
            Some(selected)
        };
        self.refresh_head_to_head();
    }

    pub fn refresh_head_to_head(&mut self) {
        self.head_to_head = None;
        let (Some(snapshot), Some(league), Some(pinned)) =
            (self.snapshot.clone(), self.league.as_ref(), self.league_pinned)
        else {
            return;
        };
        let Some(selected) = self.selected_league_manager().map(|m| m.manager_id) else {
            return;
        };
        if selected == pinned {
            return;
        }
        match api::head_to_head(&snapshot, league, pinned, selected) {
            Ok(h2h) => self.head_to_head = Some(h2h),
            Err(err) => self.push_log(format!("[WARN] Head to head: {err}")),
        }
    }

    /// Recommendations for the manager id from the Transfers screen, when
    /// that manager is in the loaded league.
    pub fn refresh_league_recommendations(&mut self) {
        self.league_recommendations = None;
        let (Some(snapshot), Some(league), Some(manager_id)) =
            (self.snapshot.clone(), self.league.as_ref(), self.manager_id())
        else {
            return;
        };
        if league.manager(manager_id).is_none() {
            return;
        }
        match api::league_recommendations(&snapshot, &self.scoring, league, manager_id) {
            Ok(recs) => self.league_recommendations = Some(recs),
            Err(err) => self.push_log(format!("[WARN] League recommendations: {err}")),
        }
    }

    fn rebuild_league_view(&mut self) {
        self.league_view = match (self.snapshot.as_ref(), self.league.as_ref()) {
            (Some(snapshot), Some(league)) => {
                Some(api::mini_league_view(snapshot, &self.scoring, league))
            }
            _ => None,
        };
    }

    pub fn refresh_replacements(&mut self) {
        self.replacements = None;
        let Some(snapshot) = self.snapshot.clone() else {
            return;
        };
        let Some(player_id) = self.selected_review_player().map(|p| p.id) else {
            return;
        };
        match api::replacements(&snapshot, &self.scoring, player_id, None, None) {
            Ok(view) => self.replacements = Some(view),
            Err(err) => self.push_log(format!("[WARN] Replacements: {err}")),
        }
    }

    pub fn refresh_search(&mut self) {
        let Some(snapshot) = self.snapshot.clone() else {
            self.search_results = None;
            self.search_detail = None;
            return;
        };
        self.search_results = Some(api::search(&snapshot, &self.scoring, &self.search_query));
        self.search_selected = 0;
        self.refresh_search_detail();
    }

    fn refresh_search_detail(&mut self) {
        self.search_detail = None;
        let Some(snapshot) = self.snapshot.clone() else {
            return;
        };
        let Some(player_id) = self
            .search_results
            .as_ref()
            .and_then(|r| r.players.get(self.search_selected))
            .map(|p| p.id)
        else {
            return;
        };
        match api::player_detail(&snapshot, &self.scoring, player_id) {
            Ok(detail) => self.search_detail = Some(detail),
            Err(err) => self.push_log(format!("[WARN] Player detail: {err}")),
        }
    }
}

fn next_position(pos: Position) -> Position {
    let idx = Position::ALL.iter().position(|p| *p == pos).unwrap_or(0);
    Position::ALL[(idx + 1) % Position::ALL.len()]
}

#[derive(Debug, Clone)]
pub struct ExportState {
    pub active: bool,
    pub done: bool,
    pub path: Option<String>,
    pub current: usize,
    pub total: usize,
    pub message: String,
    pub error_count: usize,
    pub last_updated: Option<std::time::Instant>,
}

impl Default for ExportState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportState {
    pub fn new() -> Self {
        Self {
            active: false,
            done: false,
            path: None,
            current: 0,
            total: 0,
            message: String::new(),
            error_count: 0,
            last_updated: None,
        }
    }

    pub fn clear_if_done_for(&mut self, now: std::time::Instant, keep_secs: u64) {
        if !self.active || !self.done {
            return;
        }
        let Some(last) = self.last_updated else {
            return;
        };
        if now.duration_since(last).as_secs() >= keep_secs {
            *self = Self::new();
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetSnapshot(Arc<Snapshot>),
    InitFailed(String),
    SetTeamReview(SquadReview),
    TeamReviewFailed {
        manager_id: u32,
        message: String,
    },
    SetLeague(MiniLeague),
    LeagueFailed {
        league_id: u32,
        message: String,
    },
    ExportStarted {
        path: String,
        total: usize,
    },
    ExportProgress {
        current: usize,
        total: usize,
        message: String,
    },
    ExportFinished {
        path: String,
        sheets: usize,
        rows: usize,
        errors: usize,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Initialize,
    FetchTeamReview { manager_id: u32 },
    FetchLeague { league_id: u32 },
    Export { path: String },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetSnapshot(snapshot) => {
            state.views = Some(AnalyticsViews::build(
                &snapshot,
                &state.scoring,
                state.value_position,
            ));
            state.push_log(format!(
                "[INFO] Loaded {} players, {} teams (GW played {}, skipped {})",
                snapshot.players.len(),
                snapshot.teams.len(),
                snapshot.gameweeks.played,
                snapshot.skipped_records
            ));
            state.snapshot = Some(snapshot);
            state.loading = false;
            state.clamp_selection();
            if state.search_results.is_some() {
                state.refresh_search();
            }
            if state.review.is_some() {
                state.refresh_replacements();
            }
            if state.league.is_some() {
                state.rebuild_league_view();
                state.refresh_head_to_head();
                state.refresh_league_recommendations();
            }
        }
        Delta::InitFailed(message) => {
            state.loading = false;
            state.push_log(format!("[ERROR] Initialization failed: {message}"));
        }
        Delta::SetTeamReview(review) => {
            // Ignore a stale answer for a manager the user has moved away from.
            if state.manager_id().is_some_and(|id| id != review.manager_id) {
                return;
            }
            state.push_log(format!(
                "[INFO] Manager {} GW{}: {} players, {} with issues",
                review.manager_id,
                review.gameweek,
                review.players.len(),
                review.summary.players_with_issues
            ));
            state.review = Some(review);
            state.review_loading = false;
            state.squad_selected = 0;
            state.refresh_replacements();
            state.refresh_league_recommendations();
        }
        Delta::TeamReviewFailed {
            manager_id,
            message,
        } => {
            state.review_loading = false;
            state.push_log(format!("[WARN] Team review for {manager_id}: {message}"));
        }
        Delta::SetLeague(league) => {
            if state.league_id().is_some_and(|id| id != league.league_id) {
                return;
            }
            state.push_log(format!(
                "[INFO] League {} \"{}\": {} managers, {} failed",
                league.league_id,
                league.name,
                league.managers.len(),
                league.failed_managers.len()
            ));
            state.league = Some(league);
            state.league_loading = false;
            state.league_selected = 0;
            state.league_pinned = None;
            state.head_to_head = None;
            state.rebuild_league_view();
            state.refresh_league_recommendations();
        }
        Delta::LeagueFailed { league_id, message } => {
            state.league_loading = false;
            state.push_log(format!("[WARN] League {league_id}: {message}"));
        }
        Delta::ExportStarted { path, total } => {
            state.export.active = true;
            state.export.path = Some(path);
            state.export.total = total;
            state.export.current = 0;
            state.export.message = "Starting export".to_string();
            state.export.done = false;
            state.export.error_count = 0;
            state.export.last_updated = Some(std::time::Instant::now());
        }
        Delta::ExportProgress {
            current,
            total,
            message,
        } => {
            state.export.active = true;
            state.export.total = total;
            state.export.current = current;
            state.export.message = message;
            state.export.last_updated = Some(std::time::Instant::now());
        }
        Delta::ExportFinished {
            path,
            sheets,
            rows,
            errors,
        } => {
            state.export.active = true;
            state.export.path = Some(path);
            state.export.current = state.export.total;
            state.export.message = format!("Done: {sheets} sheets, {rows} rows ({errors} errors)");
            state.export.done = true;
            state.export.error_count = errors;
            state.export.last_updated = Some(std::time::Instant::now());
            state.push_log(format!("[INFO] Export finished ({errors} errors)"));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
