//! Host view state: owns the snapshot, the interaction state and the cursor,
//! and turns input into commands for the runtime.

use chrono::{DateTime, Utc};
use dagboard_core::column::{ColumnId, ColumnModel};
use dagboard_core::model::{DagLeaf, ItemSnapshot, RowId};
use dagboard_core::schedule::{CronEvaluator, ScheduleEvaluator};
use dagboard_core::sort::SortState;
use dagboard_core::table::{DisplayRow, TableView, ViewState};

use crate::actions::{ActionError, ActionKind};
use crate::input::{is_interrupt, InputEvent, Key, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Main,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,
    Refresh,
    RunAction { kind: ActionKind, dag: DagLeaf },
}

impl Command {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

pub struct App {
    snapshot: ItemSnapshot,
    state: ViewState,
    model: ColumnModel,
    evaluator: Box<dyn ScheduleEvaluator>,
    view: TableView,
    tag_options: Vec<String>,
    mode: UiMode,
    filter_text: String,
    selected_idx: usize,
    selected_id: Option<RowId>,
    status_line: String,
    load_error: Option<String>,
    width: usize,
    height: usize,
    quitting: bool,
}

impl App {
    pub fn new(scope: &str, sort: SortState, now: DateTime<Utc>) -> Self {
        Self::with_evaluator(scope, sort, Box::new(CronEvaluator), now)
    }

    pub fn with_evaluator(
        scope: &str,
        sort: SortState,
        evaluator: Box<dyn ScheduleEvaluator>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut state = ViewState::for_scope(scope);
        state.sort = sort;
        let model = ColumnModel::standard();
        let snapshot = ItemSnapshot::default();
        let view = TableView::build(&snapshot.dags, &state, &model, evaluator.as_ref(), now);
        Self {
            snapshot,
            state,
            model,
            evaluator,
            view,
            tag_options: vec![String::new()],
            mode: UiMode::Main,
            filter_text: String::new(),
            selected_idx: 0,
            selected_id: None,
            status_line: String::new(),
            load_error: None,
            width: 0,
            height: 0,
            quitting: false,
        }
    }

    /// Replace the item list wholesale. View state carries over.
    pub fn set_snapshot(&mut self, snapshot: ItemSnapshot, now: DateTime<Utc>) {
        self.state.reconcile(&snapshot.dags);
        self.tag_options = dagboard_core::grouping::tag_options(&snapshot.dags);
        self.snapshot = snapshot;
        self.load_error = None;
        self.rebuild(now);
    }

    /// Keep showing the last good snapshot and surface the failure.
    pub fn set_load_error(&mut self, message: String) {
        tracing::warn!(error = %message, "item refresh failed");
        self.load_error = Some(message);
    }

    /// Countdown tick. Never reorders rows.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.view.tick(self.evaluator.as_ref(), now);
    }

    pub fn action_result(&mut self, result: Result<String, ActionError>) -> Command {
        match result {
            Ok(message) => {
                self.status_line = message;
                Command::Refresh
            }
            Err(err) => {
                tracing::warn!(error = %err, "action failed");
                self.status_line = format!("error: {err}");
                Command::None
            }
        }
    }

    pub fn update(&mut self, event: InputEvent) -> Command {
        if let InputEvent::Resize(resize) = event {
            self.width = resize.width;
            self.height = resize.height;
            return Command::None;
        }
        if is_interrupt(&event) {
            self.quitting = true;
            return Command::Quit;
        }
        let InputEvent::Key(key) = event else {
            return Command::None;
        };
        match self.mode {
            UiMode::Main => self.update_main_mode(key),
            UiMode::Filter => self.update_filter_mode(key),
        }
    }

    fn update_main_mode(&mut self, key: KeyEvent) -> Command {
        match key.key {
            Key::Char('q') => {
                self.quitting = true;
                Command::Quit
            }
            Key::Char('j') | Key::Down => {
                self.move_selection(1);
                Command::None
            }
            Key::Char('k') | Key::Up => {
                self.move_selection(-1);
                Command::None
            }
            Key::Enter | Key::Char(' ') => {
                if let Some(RowId::Group(name)) = self.selected_id.clone() {
                    let expanded = self.state.expansion.toggle(&name);
                    tracing::debug!(group = %name, expanded, "group toggled");
                    self.rebuild(self.view.now());
                }
                Command::None
            }
            Key::Char('e') => {
                self.state.toggle_all_groups(&self.snapshot.dags);
                self.rebuild(self.view.now());
                Command::None
            }
            Key::Char('/') => {
                self.mode = UiMode::Filter;
                Command::None
            }
            Key::Char('t') => {
                self.cycle_tag_filter(1);
                Command::None
            }
            Key::Char('T') => {
                self.cycle_tag_filter(-1);
                Command::None
            }
            Key::Char('c') => {
                self.filter_text.clear();
                self.state.filters.clear_all();
                self.rebuild(self.view.now());
                Command::None
            }
            Key::Char(ch @ '1'..='8') => {
                let idx = ch as usize - '0' as usize;
                if let Some(column) = ColumnId::ALL.get(idx).copied() {
                    self.state.sort.toggle(column, &self.model);
                    self.rebuild(self.view.now());
                }
                Command::None
            }
            Key::Char('r') => Command::Refresh,
            Key::Char('s') => self.leaf_action(|_| ActionKind::Start),
            Key::Char('x') => self.leaf_action(|_| ActionKind::Stop),
            Key::Char('l') => self.leaf_action(ActionKind::live_toggle),
            _ => Command::None,
        }
    }

    fn update_filter_mode(&mut self, key: KeyEvent) -> Command {
        match key.key {
            Key::Escape | Key::Enter => {
                self.mode = UiMode::Main;
                Command::None
            }
            Key::Backspace => {
                if self.filter_text.pop().is_some() {
                    self.apply_name_filter();
                }
                Command::None
            }
            Key::Char(ch) => {
                self.filter_text.push(ch);
                self.apply_name_filter();
                Command::None
            }
            _ => Command::None,
        }
    }

    fn leaf_action(&mut self, kind: impl FnOnce(&DagLeaf) -> ActionKind) -> Command {
        let Some(leaf) = self.selected_row().and_then(|row| row.row.as_leaf()).cloned() else {
            self.status_line = "select a DAG first".to_string();
            return Command::None;
        };
        let kind = kind(&leaf);
        self.status_line = format!("{kind} {}...", leaf.name);
        Command::RunAction { kind, dag: leaf }
    }

    fn apply_name_filter(&mut self) {
        self.state.filters.set(ColumnId::Name, &self.filter_text);
        tracing::debug!(filter = %self.filter_text, "name filter changed");
        self.rebuild(self.view.now());
    }

    fn cycle_tag_filter(&mut self, delta: i32) {
        self.state
            .filters
            .cycle(ColumnId::Tags, &self.tag_options, delta);
        tracing::debug!(tag = %self.state.filters.get(ColumnId::Tags), "tag filter changed");
        self.rebuild(self.view.now());
    }

    fn rebuild(&mut self, now: DateTime<Utc>) {
        self.view = TableView::build(
            &self.snapshot.dags,
            &self.state,
            &self.model,
            self.evaluator.as_ref(),
            now,
        );
        let previous_id = self.selected_id.clone();
        let previous_idx = self.selected_idx;
        self.apply_selection(previous_id.as_ref(), previous_idx);
    }

    fn apply_selection(&mut self, previous_id: Option<&RowId>, previous_idx: usize) {
        if self.view.is_empty() {
            self.selected_idx = 0;
            self.selected_id = None;
            return;
        }
        if let Some(idx) = previous_id.and_then(|id| self.view.position(id)) {
            self.selected_idx = idx;
            return;
        }
        let idx = previous_idx.min(self.view.len() - 1);
        self.selected_idx = idx;
        self.selected_id = self.view.get(idx).map(DisplayRow::id);
    }

    fn move_selection(&mut self, delta: i32) {
        if self.view.is_empty() {
            return;
        }
        let max = self.view.len() as i64 - 1;
        let next = (self.selected_idx as i64 + i64::from(delta)).clamp(0, max);
        self.selected_idx = next as usize;
        self.selected_id = self.view.get(self.selected_idx).map(DisplayRow::id);
    }

    #[must_use]
    pub fn view(&self) -> &TableView {
        &self.view
    }

    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub fn model(&self) -> &ColumnModel {
        &self.model
    }

    #[must_use]
    pub fn snapshot(&self) -> &ItemSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn tag_options(&self) -> &[String] {
        &self.tag_options
    }

    #[must_use]
    pub fn mode(&self) -> UiMode {
        self.mode
    }

    #[must_use]
    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    #[must_use]
    pub fn selected_idx(&self) -> usize {
        self.selected_idx
    }

    #[must_use]
    pub fn selected_row(&self) -> Option<&DisplayRow> {
        self.view.get(self.selected_idx)
    }

    #[must_use]
    pub fn selected_name(&self) -> Option<&str> {
        self.selected_row().map(|row| row.row.name())
    }

    #[must_use]
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn quitting(&self) -> bool {
        self.quitting
    }

}
