//! Stable multi-key sorting over the two-tier row set.

use std::cmp::Ordering;

use crate::column::{ColumnContext, ColumnId, ColumnModel};
use crate::model::{DagLeaf, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: ColumnId,
    pub descending: bool,
}

impl SortKey {
    #[must_use]
    pub const fn ascending(column: ColumnId) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    #[must_use]
    pub const fn descending(column: ColumnId) -> Self {
        Self {
            column,
            descending: true,
        }
    }
}

/// Active sort keys owned by the hosting view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    keys: Vec<SortKey>,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            keys: vec![SortKey::ascending(ColumnId::Name)],
        }
    }
}

impl SortState {
    #[must_use]
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    #[must_use]
    pub fn unsorted() -> Self {
        Self { keys: Vec::new() }
    }

    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// The governing key; this view only ever keeps one.
    #[must_use]
    pub fn active(&self) -> Option<SortKey> {
        self.keys.first().copied()
    }

    /// Header-click semantics: a new column replaces the key (ascending); the
    /// active column cycles ascending -> descending -> cleared.
    pub fn toggle(&mut self, column: ColumnId, model: &ColumnModel) {
        if !model.get(column).is_some_and(|column| column.is_sortable()) {
            return;
        }
        self.keys = match self.active() {
            Some(key) if key.column == column && !key.descending => {
                vec![SortKey::descending(column)]
            }
            Some(key) if key.column == column => Vec::new(),
            _ => vec![SortKey::ascending(column)],
        };
        tracing::debug!(column = %column, keys = ?self.keys, "sort toggled");
    }
}

/// Compare by each key in order; first non-equal result wins.
#[must_use]
pub fn compare_rows(
    a: &Row,
    b: &Row,
    keys: &[SortKey],
    model: &ColumnModel,
    ctx: &ColumnContext<'_>,
) -> Ordering {
    for key in keys {
        let Some(column) = model.get(key.column) else {
            continue;
        };
        let ordering = column.compare(a, b, ctx);
        let ordering = if key.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Sort the top-level sequence, then each group's children, with the same keys.
///
/// `sort_by` is stable, so rows comparing equal keep their prior order.
#[must_use]
pub fn sort_rows(
    rows: Vec<Row>,
    keys: &[SortKey],
    model: &ColumnModel,
    ctx: &ColumnContext<'_>,
) -> Vec<Row> {
    if keys.is_empty() {
        return rows;
    }
    let mut rows: Vec<Row> = rows
        .into_iter()
        .map(|row| match row {
            Row::Group(mut group) => {
                group.children = sort_leaves(std::mem::take(&mut group.children), keys, model, ctx);
                Row::Group(group)
            }
            leaf @ Row::Leaf(_) => leaf,
        })
        .collect();
    rows.sort_by(|a, b| compare_rows(a, b, keys, model, ctx));
    rows
}

fn sort_leaves(
    leaves: Vec<DagLeaf>,
    keys: &[SortKey],
    model: &ColumnModel,
    ctx: &ColumnContext<'_>,
) -> Vec<DagLeaf> {
    let mut wrapped: Vec<Row> = leaves.into_iter().map(Row::Leaf).collect();
    wrapped.sort_by(|a, b| compare_rows(a, b, keys, model, ctx));
    wrapped
        .into_iter()
        .filter_map(|row| match row {
            Row::Leaf(leaf) => Some(leaf),
            Row::Group(_) => None,
        })
        .collect()
}
