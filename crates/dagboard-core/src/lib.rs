//! dagboard-core: row assembly, column model, and interaction state for the
//! DAG status overview.
//!
//! The crate turns a flat list of DAG definitions into the two-tier rows a
//! view draws. Everything here is synchronous and recomputed from scratch on
//! each pass; the host owns the `ViewState` and the timers.

pub mod column;
pub mod countdown;
pub mod expansion;
pub mod filter;
pub mod grouping;
pub mod model;
pub mod schedule;
pub mod sort;
pub mod table;

pub use column::{ColumnId, ColumnModel};
pub use model::{DagLeaf, ItemSnapshot, Row, RowId, SchedulerStatus};
pub use schedule::{CronEvaluator, ScheduleEvaluator};
pub use table::{DisplayRow, TableView, ViewState};

/// Crate identity label.
pub fn crate_label() -> &'static str {
    "dagboard-core"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "dagboard-core");
    }

    #[test]
    fn modules_are_accessible() {
        let _ = model::SchedulerStatus::Running;
        let _ = column::ColumnId::NextRun;
        let _ = sort::SortState::default();
        let _ = filter::FilterState::new();
        let _ = expansion::ExpansionState::new();
        let _ = table::ViewState::default();
        let _ = countdown::Granularity::Seconds;
        let _ = schedule::CronEvaluator;
    }
}
