//! Group expansion tracking across rebuilds.

use std::collections::BTreeMap;

/// Expanded flags keyed by group name, falling back to a global default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionState {
    default_expanded: bool,
    overrides: BTreeMap<String, bool>,
}

impl Default for ExpansionState {
    fn default() -> Self {
        Self {
            default_expanded: true,
            overrides: BTreeMap::new(),
        }
    }
}

impl ExpansionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_expanded(&self, group: &str) -> bool {
        self.overrides
            .get(group)
            .copied()
            .unwrap_or(self.default_expanded)
    }

    /// Flip a single group. Returns the new state.
    pub fn toggle(&mut self, group: &str) -> bool {
        let next = !self.is_expanded(group);
        self.overrides.insert(group.to_owned(), next);
        next
    }

    pub fn set_all(&mut self, expanded: bool) {
        self.default_expanded = expanded;
        self.overrides.clear();
    }

    /// Collapse everything when at least half of `groups` are open, otherwise
    /// expand everything. Returns the state applied.
    pub fn toggle_all<'a, I>(&mut self, groups: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut known = 0usize;
        let mut open = 0usize;
        for group in groups {
            known += 1;
            if self.is_expanded(group) {
                open += 1;
            }
        }
        let expand = if known == 0 {
            !self.default_expanded
        } else {
            open * 2 < known
        };
        self.set_all(expand);
        tracing::debug!(known, open, expand, "toggled all groups");
        expand
    }

    #[must_use]
    pub fn is_all_expanded<'a, I>(&self, groups: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        groups.into_iter().all(|group| self.is_expanded(group))
    }

    /// Forget overrides for groups that no longer exist.
    pub fn retain_known<'a, I>(&mut self, groups: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: std::collections::BTreeSet<&str> = groups.into_iter().collect();
        self.overrides.retain(|name, _| known.contains(name.as_str()));
    }
}
