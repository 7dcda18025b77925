//! The full render pass: assemble, sort, filter, then gate children by
//! expansion.

use chrono::{DateTime, Utc};

use crate::column::{ColumnContext, ColumnId, ColumnModel};
use crate::expansion::ExpansionState;
use crate::filter::{filter_rows, FilterState};
use crate::grouping::assemble;
use crate::model::{DagLeaf, Row, RowId};
use crate::schedule::{NextRunIndex, ScheduleEvaluator};
use crate::sort::{sort_rows, SortKey, SortState};

/// Interaction state owned by the hosting view; survives rebuilds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub scope: String,
    pub sort: SortState,
    pub filters: FilterState,
    pub expansion: ExpansionState,
}

impl ViewState {
    #[must_use]
    pub fn for_scope(scope: &str) -> Self {
        Self {
            scope: scope.to_owned(),
            ..Self::default()
        }
    }

    /// Drop expansion entries for groups absent from `leaves`.
    pub fn reconcile(&mut self, leaves: &[DagLeaf]) {
        let groups = group_names(leaves);
        self.expansion
            .retain_known(groups.iter().map(String::as_str));
    }

    pub fn toggle_all_groups(&mut self, leaves: &[DagLeaf]) -> bool {
        let groups = group_names(leaves);
        self.expansion.toggle_all(groups.iter().map(String::as_str))
    }
}

/// A row as emitted to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub row: Row,
    /// 0 for top-level rows, 1 for group children.
    pub depth: usize,
    pub expanded: bool,
}

impl DisplayRow {
    #[must_use]
    pub fn id(&self) -> RowId {
        self.row.id()
    }

    #[must_use]
    pub fn is_expandable(&self) -> bool {
        matches!(self.row, Row::Group(_))
    }
}

/// Result of one render pass plus what the host needs to draw it.
#[derive(Debug, Clone)]
pub struct TableView {
    rows: Vec<DisplayRow>,
    next_runs: NextRunIndex,
    now: DateTime<Utc>,
    sort: Option<SortKey>,
    filters: Vec<(ColumnId, String)>,
    all_expanded: bool,
}

impl TableView {
    #[must_use]
    pub fn build(
        leaves: &[DagLeaf],
        state: &ViewState,
        model: &ColumnModel,
        evaluator: &dyn ScheduleEvaluator,
        now: DateTime<Utc>,
    ) -> Self {
        let next_runs = NextRunIndex::compute(leaves, evaluator, now);
        let ctx = ColumnContext {
            next_runs: &next_runs,
            now,
        };
        let assembled = assemble(leaves, &state.scope);
        let all_expanded = state.expansion.is_all_expanded(
            assembled
                .iter()
                .filter(|row| matches!(row, Row::Group(_)))
                .map(Row::name),
        );
        let sorted = sort_rows(assembled, state.sort.keys(), model, &ctx);
        let visible = filter_rows(sorted, &state.filters, model);
        let rows = flatten(visible, &state.expansion);
        tracing::debug!(
            leaves = leaves.len(),
            rows = rows.len(),
            scheduled = next_runs.len(),
            "table rebuilt"
        );

        Self {
            rows,
            next_runs,
            now,
            sort: state.sort.active(),
            filters: state
                .filters
                .active()
                .map(|(column, value)| (column, value.to_owned()))
                .collect(),
            all_expanded,
        }
    }

    /// Countdown tick: refresh next-run epochs for the visible leaves only.
    /// Row order is left untouched.
    pub fn tick(&mut self, evaluator: &dyn ScheduleEvaluator, now: DateTime<Utc>) {
        let leaves: Vec<DagLeaf> = self
            .rows
            .iter()
            .filter_map(|display| display.row.as_leaf().cloned())
            .collect();
        self.next_runs = NextRunIndex::compute(&leaves, evaluator, now);
        self.now = now;
    }

    #[must_use]
    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DisplayRow> {
        self.rows.get(index)
    }

    #[must_use]
    pub fn position(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().position(|display| &display.id() == id)
    }

    #[must_use]
    pub fn sort(&self) -> Option<SortKey> {
        self.sort
    }

    #[must_use]
    pub fn filters(&self) -> &[(ColumnId, String)] {
        &self.filters
    }

    /// True when every group in scope is expanded, filtered out or not.
    #[must_use]
    pub fn all_expanded(&self) -> bool {
        self.all_expanded
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    #[must_use]
    pub fn next_runs(&self) -> &NextRunIndex {
        &self.next_runs
    }

    #[must_use]
    pub fn context(&self) -> ColumnContext<'_> {
        ColumnContext {
            next_runs: &self.next_runs,
            now: self.now,
        }
    }

    /// Formatted text for every column of `row`, in model order.
    #[must_use]
    pub fn cells(&self, row: &DisplayRow, model: &ColumnModel) -> Vec<String> {
        let ctx = self.context();
        model
            .columns()
            .iter()
            .map(|column| column.format(&row.row, &ctx))
            .collect()
    }
}

fn flatten(rows: Vec<Row>, expansion: &ExpansionState) -> Vec<DisplayRow> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Row::Leaf(_) => out.push(DisplayRow {
                row,
                depth: 0,
                expanded: false,
            }),
            Row::Group(group) => {
                let expanded = expansion.is_expanded(&group.name);
                let children = if expanded {
                    group.children.clone()
                } else {
                    Vec::new()
                };
                out.push(DisplayRow {
                    row: Row::Group(group),
                    depth: 0,
                    expanded,
                });
                out.extend(children.into_iter().map(|child| DisplayRow {
                    row: Row::Leaf(child),
                    depth: 1,
                    expanded: false,
                }));
            }
        }
    }
    out
}

fn group_names(leaves: &[DagLeaf]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for leaf in leaves {
        if !leaf.group_key.is_empty() && !names.contains(&leaf.group_key) {
            names.push(leaf.group_key.clone());
        }
    }
    names
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::{TableView, ViewState};
    use crate::column::{ColumnId, ColumnModel};
    use crate::model::{DagLeaf, RowId};
    use crate::schedule::{ScheduleError, ScheduleEvaluator};

    /// Next run is always `offset` seconds after the reference.
    struct FixedOffset(i64);

    impl ScheduleEvaluator for FixedOffset {
        fn next_run_epoch(
            &self,
            _expressions: &[String],
            reference: DateTime<Utc>,
        ) -> Result<i64, ScheduleError> {
            Ok(reference.timestamp() + self.0)
        }
    }

    fn leaf(name: &str, group: &str) -> DagLeaf {
        DagLeaf {
            group_key: group.to_owned(),
            ..DagLeaf::new(name)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap()
    }

    fn labels(view: &TableView) -> Vec<String> {
        view.rows()
            .iter()
            .map(|row| format!("{}{}", "  ".repeat(row.depth), row.row.name()))
            .collect()
    }

    #[test]
    fn collapsed_groups_hide_children() {
        let leaves = vec![leaf("a", "g1"), leaf("b", ""), leaf("c", "g1")];
        let mut state = ViewState::default();
        let model = ColumnModel::standard();

        let view = TableView::build(&leaves, &state, &model, &FixedOffset(60), now());
        assert_eq!(labels(&view), vec!["b", "g1", "  a", "  c"]);
        assert!(view.rows()[1].expanded);
        assert!(view.rows()[1].is_expandable());
        assert!(!view.rows()[0].is_expandable());

        state.expansion.toggle("g1");
        let view = TableView::build(&leaves, &state, &model, &FixedOffset(60), now());
        assert_eq!(labels(&view), vec!["b", "g1"]);
        assert_eq!(view.position(&RowId::Group("g1".to_owned())), Some(1));
    }

    #[test]
    fn exposes_sort_filters_and_expansion_summary() {
        let mut tagged = leaf("c", "g1");
        tagged.tags = vec!["daily".to_owned()];
        let leaves = vec![leaf("a", "g1"), leaf("b", ""), tagged];
        let mut state = ViewState::default();
        state.filters.set(ColumnId::Tags, "daily");
        let view = TableView::build(
            &leaves,
            &state,
            &ColumnModel::standard(),
            &FixedOffset(60),
            now(),
        );
        assert_eq!(labels(&view), vec!["g1", "  c"]);
        assert_eq!(view.filters(), &[(ColumnId::Tags, "daily".to_owned())]);
        assert_eq!(view.sort().map(|key| key.column), Some(ColumnId::Name));
        assert!(view.all_expanded());

        state.expansion.toggle("g1");
        let view = TableView::build(
            &leaves,
            &state,
            &ColumnModel::standard(),
            &FixedOffset(60),
            now(),
        );
        assert!(!view.all_expanded());
    }

    #[test]
    fn tick_updates_countdown_without_reordering() {
        let mut a = leaf("a", "");
        a.schedule_expressions = vec!["* * * * *".to_owned()];
        let mut b = leaf("b", "");
        b.schedule_expressions = vec!["* * * * *".to_owned()];
        let leaves = vec![b, a];
        let model = ColumnModel::standard();
        let mut view = TableView::build(
            &leaves,
            &ViewState::default(),
            &model,
            &FixedOffset(90),
            now(),
        );
        let before = labels(&view);
        let next_run = |view: &TableView| {
            let cells = view.cells(&view.rows()[0], &model);
            cells[7].clone()
        };
        assert_eq!(next_run(&view), "in 2m");

        view.tick(&FixedOffset(30), now() + chrono::Duration::seconds(1));
        assert_eq!(labels(&view), before);
        assert_eq!(next_run(&view), "in 30s");
    }

    #[test]
    fn reconcile_and_toggle_all_use_known_groups() {
        let leaves = vec![leaf("a", "g1"), leaf("b", "g2")];
        let mut state = ViewState::default();
        state.expansion.toggle("old");
        state.reconcile(&leaves);
        assert!(state.expansion.is_expanded("old"));

        assert!(!state.toggle_all_groups(&leaves));
        assert!(!state.expansion.is_expanded("g1"));
        assert!(state.toggle_all_groups(&leaves));
        assert!(state.expansion.is_expanded("g2"));
    }

    #[test]
    fn non_empty_scope_shows_groups_only() {
        let leaves = vec![leaf("a", "g1"), leaf("b", "")];
        let view = TableView::build(
            &leaves,
            &ViewState::for_scope("g1"),
            &ColumnModel::standard(),
            &FixedOffset(60),
            now(),
        );
        assert_eq!(labels(&view), vec!["g1", "  a"]);
    }
}
