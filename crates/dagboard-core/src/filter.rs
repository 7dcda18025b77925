//! Per-column filter state and AND-composed filtering.
//!
//! Leaves are tested directly. A group survives when at least one of its
//! children survives, and keeps only those children.

use std::collections::BTreeMap;

use crate::column::{ColumnId, ColumnModel};
use crate::model::{DagLeaf, GroupRow, Row};

/// Active filter values keyed by column. Empty values mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    values: BTreeMap<ColumnId, String>,
}

impl FilterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: ColumnId, value: &str) {
        if value.is_empty() {
            self.values.remove(&column);
        } else {
            self.values.insert(column, value.to_owned());
        }
    }

    /// Current value for `column`, empty when unconstrained.
    #[must_use]
    pub fn get(&self, column: ColumnId) -> &str {
        self.values.get(&column).map_or("", String::as_str)
    }

    pub fn clear(&mut self, column: ColumnId) {
        self.values.remove(&column);
    }

    pub fn clear_all(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn active(&self) -> impl Iterator<Item = (ColumnId, &str)> {
        self.values
            .iter()
            .map(|(column, value)| (*column, value.as_str()))
    }

    /// Step `column` through `options` (wrapping), e.g. the tag choices.
    pub fn cycle(&mut self, column: ColumnId, options: &[String], delta: i32) {
        if options.is_empty() {
            return;
        }
        let current = self.get(column);
        let mut idx = options
            .iter()
            .position(|candidate| candidate == current)
            .map_or(0, |i| i as i32);
        idx += delta;
        if idx < 0 {
            idx = options.len() as i32 - 1;
        }
        if idx >= options.len() as i32 {
            idx = 0;
        }
        let next = options[idx as usize].clone();
        self.set(column, &next);
    }
}

/// True when `row` satisfies every active predicate.
#[must_use]
pub fn row_passes(row: &Row, filters: &FilterState, model: &ColumnModel) -> bool {
    filters.active().all(|(column, value)| {
        model
            .get(column)
            .map_or(true, |column| column.matches(row, value))
    })
}

/// Visible subset of `rows` under `filters`. Order is preserved.
#[must_use]
pub fn filter_rows(rows: Vec<Row>, filters: &FilterState, model: &ColumnModel) -> Vec<Row> {
    if filters.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter_map(|row| match row {
            Row::Leaf(leaf) => {
                let row = Row::Leaf(leaf);
                row_passes(&row, filters, model).then_some(row)
            }
            Row::Group(group) => {
                let children: Vec<DagLeaf> = group
                    .children
                    .into_iter()
                    .filter_map(|child| {
                        let row = Row::Leaf(child);
                        if row_passes(&row, filters, model) {
                            row.as_leaf().cloned()
                        } else {
                            None
                        }
                    })
                    .collect();
                (!children.is_empty()).then(|| {
                    Row::Group(GroupRow {
                        name: group.name,
                        children,
                    })
                })
            }
        })
        .collect()
}
