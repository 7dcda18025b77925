//! Row model for the DAG overview table.
//!
//! Raw items arrive as flat `DagLeaf` records; the grouping stage wraps them
//! into `Row` values. Every consumer matches on `Row` exhaustively instead of
//! probing for fields.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Scheduler status codes as reported by the workflow backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(into = "i64")]
pub enum SchedulerStatus {
    #[default]
    None,
    Running,
    Error,
    Cancel,
    Success,
    Skipped,
}

impl SchedulerStatus {
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Running,
            2 => Self::Error,
            3 => Self::Cancel,
            4 => Self::Success,
            5 => Self::Skipped,
            _ => Self::None,
        }
    }

    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Running => 1,
            Self::Error => 2,
            Self::Cancel => 3,
            Self::Success => 4,
            Self::Skipped => 5,
        }
    }

    /// Label used when the backend did not supply its own status text.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "not started",
            Self::Running => "running",
            Self::Error => "failed",
            Self::Cancel => "canceled",
            Self::Success => "finished",
            Self::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<SchedulerStatus> for i64 {
    fn from(status: SchedulerStatus) -> Self {
        status.code()
    }
}

impl<'de> Deserialize<'de> for SchedulerStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Tolerate nulls and unknown codes; a bad status must not drop the row.
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::Number(n)) => Self::from_code(n.as_i64().unwrap_or(0)),
            Some(serde_json::Value::String(text)) => match text.trim().to_ascii_lowercase().as_str()
            {
                "running" => Self::Running,
                "failed" | "error" => Self::Error,
                "canceled" | "cancel" => Self::Cancel,
                "finished" | "success" => Self::Success,
                "skipped" => Self::Skipped,
                _ => Self::None,
            },
            _ => Self::None,
        })
    }
}

/// A single schedulable DAG as delivered by the item source.
///
/// Every field tolerates `null` and wrong-typed values so one bad field
/// leaves the rest of the record usable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DagLeaf {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    /// Definition file; the stable key when present.
    #[serde(deserialize_with = "lenient_string")]
    pub file: String,
    /// Logical group; empty means ungrouped.
    #[serde(rename = "group", deserialize_with = "lenient_string")]
    pub group_key: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub tags: Vec<String>,
    pub status: SchedulerStatus,
    #[serde(deserialize_with = "lenient_string")]
    pub status_text: String,
    #[serde(deserialize_with = "lenient_optional_string")]
    pub started_at: Option<String>,
    #[serde(deserialize_with = "lenient_optional_string")]
    pub finished_at: Option<String>,
    #[serde(rename = "schedule", deserialize_with = "lenient_strings")]
    pub schedule_expressions: Vec<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub suspended: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    /// Load error for a definition that could not be parsed.
    #[serde(deserialize_with = "lenient_optional_string")]
    pub error: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(text)) => text,
        _ => String::new(),
    })
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = lenient_string(deserializer)?;
    Ok((!text.is_empty()).then_some(text))
}

/// Go encodes a nil slice as `null`; non-string entries are skipped.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(
        Option::<serde_json::Value>::deserialize(deserializer)?,
        Some(serde_json::Value::Bool(true))
    ))
}

impl DagLeaf {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// Stable identity across rebuilds: the definition file, else the name.
    #[must_use]
    pub fn key(&self) -> &str {
        if self.file.trim().is_empty() {
            &self.name
        } else {
            &self.file
        }
    }

    /// Alphabetically first tag, or empty.
    #[must_use]
    pub fn first_tag(&self) -> &str {
        self.tags
            .iter()
            .map(String::as_str)
            .min()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        !self.suspended && !self.schedule_expressions.is_empty()
    }

    /// Status text, falling back to the status label.
    #[must_use]
    pub fn display_status(&self) -> &str {
        if self.status_text.trim().is_empty() {
            self.status.label()
        } else {
            &self.status_text
        }
    }

}

/// Synthesized pseudo-row aggregating leaves that share a group key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub name: String,
    pub children: Vec<DagLeaf>,
}

/// Row kind; ordinal order is used by the schedule comparators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKind {
    Leaf,
    Group,
}

/// Stable identity of a displayed row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowId {
    Group(String),
    Leaf(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(name) => write!(f, "group:{name}"),
            Self::Leaf(key) => write!(f, "dag:{key}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Group(GroupRow),
    Leaf(DagLeaf),
}

impl Row {
    #[must_use]
    pub fn kind(&self) -> RowKind {
        match self {
            Self::Group(_) => RowKind::Group,
            Self::Leaf(_) => RowKind::Leaf,
        }
    }

    #[must_use]
    pub fn id(&self) -> RowId {
        match self {
            Self::Group(group) => RowId::Group(group.name.clone()),
            Self::Leaf(leaf) => RowId::Leaf(leaf.key().to_owned()),
        }
    }

    /// Group name or leaf name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Group(group) => &group.name,
            Self::Leaf(leaf) => &leaf.name,
        }
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<&DagLeaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Group(_) => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[DagLeaf] {
        match self {
            Self::Group(group) => &group.children,
            Self::Leaf(_) => &[],
        }
    }
}

/// One refresh worth of items plus the load errors reported alongside them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSnapshot {
    pub dags: Vec<DagLeaf>,
    pub errors: Vec<String>,
}

impl ItemSnapshot {
    #[must_use]
    pub fn new(dags: Vec<DagLeaf>) -> Self {
        Self {
            dags,
            errors: Vec::new(),
        }
    }

    /// True when the source reported errors or any DAG failed to load.
    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty() || self.dags.iter().any(|dag| dag.error.is_some())
    }
}
