//! One-level hierarchy assembly from the flat DAG list.

use std::collections::{BTreeSet, HashMap};

use crate::model::{DagLeaf, GroupRow, Row};

/// Build the row set for `scope`.
///
/// Leaves with a group key are collected under a synthesized group (first-seen
/// order). Ungrouped leaves are kept at top level only when their (empty) group
/// key equals `scope`, so a non-empty scope shows groups alone.
#[must_use]
pub fn assemble(leaves: &[DagLeaf], scope: &str) -> Vec<Row> {
    let mut groups: Vec<GroupRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut top_level = Vec::new();

    for leaf in leaves {
        if leaf.group_key.is_empty() {
            if leaf.group_key == scope {
                top_level.push(Row::Leaf(leaf.clone()));
            }
            continue;
        }
        let slot = *index.entry(leaf.group_key.as_str()).or_insert_with(|| {
            groups.push(GroupRow {
                name: leaf.group_key.clone(),
                children: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].children.push(leaf.clone());
    }

    let mut rows: Vec<Row> = groups.into_iter().map(Row::Group).collect();
    rows.extend(top_level);
    rows
}

/// Distinct tags across all leaves, sorted, with the empty "no tag" option first.
#[must_use]
pub fn tag_options(leaves: &[DagLeaf]) -> Vec<String> {
    let mut tags: BTreeSet<&str> = BTreeSet::new();
    tags.insert("");
    for leaf in leaves {
        tags.extend(leaf.tags.iter().map(String::as_str));
    }
    tags.into_iter().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::{assemble, tag_options};
    use crate::model::{DagLeaf, Row};

    fn leaf(name: &str, group: &str) -> DagLeaf {
        DagLeaf {
            group_key: group.to_owned(),
            ..DagLeaf::new(name)
        }
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(Row::name).collect()
    }

    #[test]
    fn groups_first_then_matching_top_level() {
        let leaves = vec![leaf("a", "g1"), leaf("b", ""), leaf("c", "g1")];
        let rows = assemble(&leaves, "");
        assert_eq!(names(&rows), vec!["g1", "b"]);
        let children: Vec<&str> = rows[0].children().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["a", "c"]);
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let leaves = vec![
            leaf("x", "zeta"),
            leaf("y", "alpha"),
            leaf("z", "zeta"),
            leaf("w", "beta"),
        ];
        let rows = assemble(&leaves, "");
        assert_eq!(names(&rows), vec!["zeta", "alpha", "beta"]);
        assert_eq!(rows[0].children().len(), 2);
    }

    #[test]
    fn non_empty_scope_hides_ungrouped_leaves() {
        let leaves = vec![leaf("a", "g1"), leaf("b", "")];
        let rows = assemble(&leaves, "g1");
        assert_eq!(names(&rows), vec!["g1"]);
    }

    #[test]
    fn every_grouped_leaf_appears_exactly_once() {
        let leaves = vec![
            leaf("a", "g1"),
            leaf("b", "g2"),
            leaf("c", "g1"),
            leaf("d", ""),
        ];
        let rows = assemble(&leaves, "");
        for candidate in leaves.iter().filter(|l| !l.group_key.is_empty()) {
            let hits: Vec<&Row> = rows
                .iter()
                .filter(|row| row.children().iter().any(|c| c.name == candidate.name))
                .collect();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].name(), candidate.group_key);
            assert!(!rows
                .iter()
                .any(|row| matches!(row, Row::Leaf(l) if l.name == candidate.name)));
        }
    }

    #[test]
    fn tag_options_always_include_empty() {
        assert_eq!(tag_options(&[]), vec![String::new()]);
        let mut a = leaf("a", "");
        a.tags = vec!["weekly".to_owned(), "daily".to_owned()];
        let mut b = leaf("b", "g");
        b.tags = vec!["daily".to_owned()];
        assert_eq!(tag_options(&[a, b]), vec!["", "daily", "weekly"]);
    }
}
