//! Column model: accessor, comparator, predicate and formatter per column.
//!
//! Every function here takes a `Row` and matches on its kind. Columns that mean
//! nothing for a group answer with a neutral value (`CellValue::Empty`, the
//! empty string, `false`) rather than failing.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::countdown;
use crate::model::{DagLeaf, Row, SchedulerStatus};
use crate::schedule::NextRunIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnId {
    Expand,
    Name,
    Tags,
    Status,
    StartedAt,
    FinishedAt,
    Schedule,
    NextRun,
    Description,
    Live,
    Actions,
}

impl ColumnId {
    pub const ALL: [ColumnId; 11] = [
        Self::Expand,
        Self::Name,
        Self::Tags,
        Self::Status,
        Self::StartedAt,
        Self::FinishedAt,
        Self::Schedule,
        Self::NextRun,
        Self::Description,
        Self::Live,
        Self::Actions,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expand => "Expand",
            Self::Name => "Name",
            Self::Tags => "Tags",
            Self::Status => "Status",
            Self::StartedAt => "StartedAt",
            Self::FinishedAt => "FinishedAt",
            Self::Schedule => "Schedule",
            Self::NextRun => "NextRun",
            Self::Description => "Description",
            Self::Live => "Live",
            Self::Actions => "Actions",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| format!("unknown column {raw:?}"))
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed cell value produced by a column accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Empty,
    Text(String),
    List(Vec<String>),
    Status(SchedulerStatus),
    Epoch(i64),
    Flag(bool),
}

/// Per-render-pass inputs the columns may consult.
#[derive(Debug, Clone, Copy)]
pub struct ColumnContext<'a> {
    pub next_runs: &'a NextRunIndex,
    pub now: DateTime<Utc>,
}

pub type Accessor = fn(&Row, &ColumnContext<'_>) -> CellValue;
pub type Comparator = fn(&Row, &Row, &ColumnContext<'_>) -> Ordering;
pub type Predicate = fn(&Row, &str) -> bool;
pub type Formatter = fn(&Row, &ColumnContext<'_>) -> String;

#[derive(Clone, Copy)]
pub struct ColumnSpec {
    pub id: ColumnId,
    pub header: &'static str,
    pub accessor: Accessor,
    pub comparator: Option<Comparator>,
    pub predicate: Option<Predicate>,
    pub formatter: Formatter,
}

impl fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("sortable", &self.is_sortable())
            .field("filterable", &self.is_filterable())
            .finish()
    }
}

impl ColumnSpec {
    #[must_use]
    pub fn is_sortable(&self) -> bool {
        self.comparator.is_some()
    }

    #[must_use]
    pub fn is_filterable(&self) -> bool {
        self.predicate.is_some()
    }

    #[must_use]
    pub fn value(&self, row: &Row, ctx: &ColumnContext<'_>) -> CellValue {
        (self.accessor)(row, ctx)
    }

    #[must_use]
    pub fn format(&self, row: &Row, ctx: &ColumnContext<'_>) -> String {
        (self.formatter)(row, ctx)
    }

    /// `Equal` for non-sortable columns so a stable sort leaves order alone.
    #[must_use]
    pub fn compare(&self, a: &Row, b: &Row, ctx: &ColumnContext<'_>) -> Ordering {
        self.comparator
            .map_or(Ordering::Equal, |comparator| comparator(a, b, ctx))
    }

    /// `true` for non-filterable columns; they never constrain.
    #[must_use]
    pub fn matches(&self, row: &Row, filter: &str) -> bool {
        self.predicate
            .map_or(true, |predicate| predicate(row, filter))
    }
}

#[derive(Debug, Clone)]
pub struct ColumnModel {
    columns: Vec<ColumnSpec>,
}

impl Default for ColumnModel {
    fn default() -> Self {
        Self::standard()
    }
}

impl ColumnModel {
    /// The DAG overview columns in display order.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            columns: vec![
                ColumnSpec {
                    id: ColumnId::Expand,
                    header: "",
                    accessor: |_, _| CellValue::Empty,
                    comparator: None,
                    predicate: None,
                    formatter: |_, _| String::new(),
                },
                ColumnSpec {
                    id: ColumnId::Name,
                    header: "Name",
                    accessor: |row, _| CellValue::Text(row.name().to_owned()),
                    comparator: Some(compare_name),
                    predicate: Some(name_matches),
                    formatter: |row, _| row.name().to_owned(),
                },
                ColumnSpec {
                    id: ColumnId::Tags,
                    header: "Tags",
                    accessor: |row, _| match row {
                        Row::Leaf(leaf) => CellValue::List(leaf.tags.clone()),
                        Row::Group(_) => CellValue::Empty,
                    },
                    comparator: Some(compare_first_tag),
                    predicate: Some(tag_matches),
                    formatter: |row, _| leaf_text(row, |leaf| leaf.tags.join(",")),
                },
                ColumnSpec {
                    id: ColumnId::Status,
                    header: "Status",
                    accessor: |row, _| match row {
                        Row::Leaf(leaf) => CellValue::Status(leaf.status),
                        Row::Group(_) => CellValue::Empty,
                    },
                    comparator: Some(compare_status),
                    predicate: None,
                    formatter: |row, _| leaf_text(row, |leaf| leaf.display_status().to_owned()),
                },
                ColumnSpec {
                    id: ColumnId::StartedAt,
                    header: "Started At",
                    accessor: |row, _| optional_text(row, started_at),
                    comparator: Some(compare_started_at),
                    predicate: None,
                    formatter: |row, _| {
                        leaf_text(row, |leaf| leaf.started_at.clone().unwrap_or_default())
                    },
                },
                ColumnSpec {
                    id: ColumnId::FinishedAt,
                    header: "Finished At",
                    accessor: |row, _| optional_text(row, finished_at),
                    comparator: Some(compare_finished_at),
                    predicate: None,
                    formatter: |row, _| {
                        leaf_text(row, |leaf| leaf.finished_at.clone().unwrap_or_default())
                    },
                },
                ColumnSpec {
                    id: ColumnId::Schedule,
                    header: "Schedule",
                    accessor: |row, _| match row {
                        Row::Leaf(leaf) => CellValue::List(leaf.schedule_expressions.clone()),
                        Row::Group(_) => CellValue::Empty,
                    },
                    comparator: Some(compare_next_run),
                    predicate: None,
                    formatter: |row, _| leaf_text(row, |leaf| leaf.schedule_expressions.join(" ")),
                },
                ColumnSpec {
                    id: ColumnId::NextRun,
                    header: "Next Run",
                    accessor: |row, ctx| match row {
                        Row::Leaf(leaf) => ctx
                            .next_runs
                            .get(leaf)
                            .filter(|_| leaf.is_scheduled())
                            .map_or(CellValue::Empty, CellValue::Epoch),
                        Row::Group(_) => CellValue::Empty,
                    },
                    comparator: Some(compare_next_run),
                    predicate: None,
                    formatter: |row, ctx| {
                        leaf_text(row, |leaf| {
                            countdown::cell_text(leaf, ctx.next_runs.get(leaf), ctx.now)
                        })
                    },
                },
                ColumnSpec {
                    id: ColumnId::Description,
                    header: "Description",
                    accessor: |row, _| match row {
                        Row::Leaf(leaf) => CellValue::Text(leaf.description.clone()),
                        Row::Group(_) => CellValue::Empty,
                    },
                    comparator: None,
                    predicate: None,
                    formatter: |row, _| {
                        leaf_text(row, |leaf| match &leaf.error {
                            Some(error) => format!("error: {error}"),
                            None => leaf.description.clone(),
                        })
                    },
                },
                ColumnSpec {
                    id: ColumnId::Live,
                    header: "Live",
                    accessor: |row, _| match row {
                        Row::Leaf(leaf) => CellValue::Flag(!leaf.suspended),
                        Row::Group(_) => CellValue::Empty,
                    },
                    comparator: None,
                    predicate: None,
                    formatter: |row, _| {
                        leaf_text(row, |leaf| {
                            let live = if leaf.suspended { "off" } else { "on" };
                            live.to_owned()
                        })
                    },
                },
                ColumnSpec {
                    id: ColumnId::Actions,
                    header: "Actions",
                    accessor: |_, _| CellValue::Empty,
                    comparator: None,
                    predicate: None,
                    formatter: |row, _| {
                        leaf_text(row, |leaf| {
                            if leaf.status.is_active() {
                                "stop".to_owned()
                            } else {
                                "start".to_owned()
                            }
                        })
                    },
                },
            ],
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    #[must_use]
    pub fn get(&self, id: ColumnId) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.id == id)
    }

    #[must_use]
    pub fn sortable_ids(&self) -> Vec<ColumnId> {
        self.columns
            .iter()
            .filter(|column| column.is_sortable())
            .map(|column| column.id)
            .collect()
    }

    #[must_use]
    pub fn filterable_ids(&self) -> Vec<ColumnId> {
        self.columns
            .iter()
            .filter(|column| column.is_filterable())
            .map(|column| column.id)
            .collect()
    }
}

fn leaf_text(row: &Row, text: impl FnOnce(&DagLeaf) -> String) -> String {
    match row {
        Row::Leaf(leaf) => text(leaf),
        Row::Group(_) => String::new(),
    }
}

fn optional_text(row: &Row, field: fn(&DagLeaf) -> Option<&str>) -> CellValue {
    match row {
        Row::Leaf(leaf) => field(leaf).map_or(CellValue::Empty, |v| CellValue::Text(v.to_owned())),
        Row::Group(_) => CellValue::Empty,
    }
}

fn compare_name(a: &Row, b: &Row, _ctx: &ColumnContext<'_>) -> Ordering {
    a.name().to_lowercase().cmp(&b.name().to_lowercase())
}

fn name_matches(row: &Row, filter: &str) -> bool {
    row.name().to_lowercase().contains(&filter.to_lowercase())
}

fn first_tag(row: &Row) -> &str {
    match row {
        Row::Leaf(leaf) => leaf.first_tag(),
        Row::Group(_) => "",
    }
}

fn compare_first_tag(a: &Row, b: &Row, _ctx: &ColumnContext<'_>) -> Ordering {
    first_tag(a).cmp(first_tag(b))
}

fn tag_matches(row: &Row, filter: &str) -> bool {
    match row {
        Row::Leaf(leaf) => leaf.has_tag(filter),
        Row::Group(_) => false,
    }
}

fn status_rank(row: &Row) -> SchedulerStatus {
    match row {
        Row::Leaf(leaf) => leaf.status,
        // Groups share one constant rank; ties stay in prior order.
        Row::Group(_) => SchedulerStatus::None,
    }
}

fn compare_status(a: &Row, b: &Row, _ctx: &ColumnContext<'_>) -> Ordering {
    status_rank(a).cmp(&status_rank(b))
}

fn started_at(leaf: &DagLeaf) -> Option<&str> {
    leaf.started_at.as_deref()
}

fn finished_at(leaf: &DagLeaf) -> Option<&str> {
    leaf.finished_at.as_deref()
}

// Absent timestamps compare as "", ahead of any recorded value.
fn timestamp_field<'a>(row: &'a Row, field: fn(&DagLeaf) -> Option<&str>) -> &'a str {
    match row {
        Row::Leaf(leaf) => field(leaf).unwrap_or_default(),
        Row::Group(_) => "",
    }
}

fn compare_started_at(a: &Row, b: &Row, _ctx: &ColumnContext<'_>) -> Ordering {
    timestamp_field(a, started_at).cmp(timestamp_field(b, started_at))
}

fn compare_finished_at(a: &Row, b: &Row, _ctx: &ColumnContext<'_>) -> Ordering {
    timestamp_field(a, finished_at).cmp(timestamp_field(b, finished_at))
}

fn compare_next_run(a: &Row, b: &Row, ctx: &ColumnContext<'_>) -> Ordering {
    match (a, b) {
        (Row::Leaf(left), Row::Leaf(right)) => ctx
            .next_runs
            .sort_epoch(left)
            .cmp(&ctx.next_runs.sort_epoch(right)),
        _ => a.kind().cmp(&b.kind()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cmp::Ordering;

    use chrono::{TimeZone, Utc};

    use super::{CellValue, ColumnContext, ColumnId, ColumnModel};
    use crate::model::{DagLeaf, GroupRow, Row, SchedulerStatus};
    use crate::schedule::NextRunIndex;

    fn leaf(name: &str) -> Row {
        Row::Leaf(DagLeaf::new(name))
    }

    fn group(name: &str) -> Row {
        Row::Group(GroupRow {
            name: name.to_owned(),
            children: Vec::new(),
        })
    }

    fn with_ctx<T>(index: &NextRunIndex, f: impl FnOnce(&ColumnContext<'_>) -> T) -> T {
        let ctx = ColumnContext {
            next_runs: index,
            now: Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap(),
        };
        f(&ctx)
    }

    #[test]
    fn column_ids_parse_loosely() {
        assert_eq!(ColumnId::parse("name"), Ok(ColumnId::Name));
        assert_eq!(ColumnId::parse("Next Run"), Ok(ColumnId::NextRun));
        assert_eq!(ColumnId::parse("started_at"), Ok(ColumnId::StartedAt));
        assert!(ColumnId::parse("bogus").is_err());
    }

    #[test]
    fn sortable_and_filterable_sets() {
        let model = ColumnModel::standard();
        assert_eq!(
            model.sortable_ids(),
            vec![
                ColumnId::Name,
                ColumnId::Tags,
                ColumnId::Status,
                ColumnId::StartedAt,
                ColumnId::FinishedAt,
                ColumnId::Schedule,
                ColumnId::NextRun,
            ]
        );
        assert_eq!(model.filterable_ids(), vec![ColumnId::Name, ColumnId::Tags]);
    }

    #[test]
    fn name_compare_is_case_insensitive_across_kinds() {
        let model = ColumnModel::standard();
        let name = model.get(ColumnId::Name).unwrap();
        with_ctx(&NextRunIndex::default(), |ctx| {
            assert_eq!(name.compare(&leaf("b"), &group("g1"), ctx), Ordering::Less);
            assert_eq!(name.compare(&leaf("Alpha"), &leaf("alpha"), ctx), Ordering::Equal);
        });
        assert!(name.matches(&group("Nightly"), "night"));
        assert!(!name.matches(&leaf("etl"), "nightly"));
    }

    #[test]
    fn tag_predicate_never_matches_groups() {
        let model = ColumnModel::standard();
        let tags = model.get(ColumnId::Tags).unwrap();
        let mut tagged = DagLeaf::new("c");
        tagged.tags = vec!["daily".to_owned()];
        assert!(tags.matches(&Row::Leaf(tagged), "daily"));
        assert!(!tags.matches(&group("daily"), "daily"));
    }

    #[test]
    fn status_treats_groups_as_constant() {
        let model = ColumnModel::standard();
        let status = model.get(ColumnId::Status).unwrap();
        let mut running = DagLeaf::new("r");
        running.status = SchedulerStatus::Running;
        with_ctx(&NextRunIndex::default(), |ctx| {
            assert_eq!(status.compare(&group("a"), &group("b"), ctx), Ordering::Equal);
            assert_eq!(
                status.compare(&group("a"), &Row::Leaf(running), ctx),
                Ordering::Less
            );
        });
    }

    #[test]
    fn absent_timestamps_sort_first() {
        let model = ColumnModel::standard();
        let started = model.get(ColumnId::StartedAt).unwrap();
        let mut done = DagLeaf::new("done");
        done.started_at = Some("2026-02-10 11:00:00".to_owned());
        with_ctx(&NextRunIndex::default(), |ctx| {
            assert_eq!(
                started.compare(&leaf("never"), &Row::Leaf(done), ctx),
                Ordering::Less
            );
        });
    }

    #[test]
    fn next_run_orders_kinds_then_epochs() {
        let model = ColumnModel::standard();
        let next = model.get(ColumnId::NextRun).unwrap();
        let mut soon = DagLeaf::new("soon");
        soon.schedule_expressions = vec!["* * * * *".to_owned()];
        let mut later = DagLeaf::new("later");
        later.schedule_expressions = vec!["0 * * * *".to_owned()];
        let index = NextRunIndex::from_pairs([
            ("soon".to_owned(), 1_000),
            ("later".to_owned(), 2_000),
        ]);
        with_ctx(&index, |ctx| {
            let soon = Row::Leaf(soon.clone());
            let later = Row::Leaf(later.clone());
            assert_eq!(next.compare(&soon, &later, ctx), Ordering::Less);
            assert_eq!(next.compare(&later, &group("g"), ctx), Ordering::Less);
            assert_eq!(next.compare(&group("g"), &soon, ctx), Ordering::Greater);
            assert_eq!(next.compare(&leaf("manual"), &later, ctx), Ordering::Greater);
            assert_eq!(next.value(&soon, ctx), CellValue::Epoch(1_000));
            assert_eq!(next.value(&group("g"), ctx), CellValue::Empty);
        });
    }

    #[test]
    fn group_rows_render_empty_leaf_cells() {
        let model = ColumnModel::standard();
        with_ctx(&NextRunIndex::default(), |ctx| {
            for column in model.columns() {
                let text = column.format(&group("g1"), ctx);
                if column.id == ColumnId::Name {
                    assert_eq!(text, "g1");
                } else {
                    assert_eq!(text, "", "column {}", column.id);
                }
            }
        });
    }
}
