//! Where the DAG list comes from.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dagboard_core::model::{DagLeaf, ItemSnapshot};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("item source unavailable")]
    Unavailable,
}

pub trait ItemSource {
    /// Fetch a fresh snapshot of every DAG.
    fn load(&self) -> Result<ItemSnapshot, SourceError>;

    fn describe(&self) -> String;
}

/// Accepts either a full snapshot object or a bare array of DAGs. Records stay
/// raw until each one is decoded on its own.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    List(Vec<serde_json::Value>),
    Snapshot {
        #[serde(default)]
        dags: Option<Vec<serde_json::Value>>,
        #[serde(default)]
        errors: Option<Vec<serde_json::Value>>,
    },
}

/// Reads a JSON document from disk on every load.
#[derive(Debug, Clone)]
pub struct FileItemSource {
    path: PathBuf,
}

impl FileItemSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemSource for FileItemSource {
    fn load(&self) -> Result<ItemSnapshot, SourceError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Read {
            path: self.path.clone(),
            source,
        })?;
        let snapshot = decode_snapshot(&text).map_err(|source| SourceError::Decode {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            path = %self.path.display(),
            dags = snapshot.dags.len(),
            errors = snapshot.errors.len(),
            "loaded item snapshot"
        );
        Ok(snapshot)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Decode a snapshot document. Only a malformed document fails; a record that
/// cannot be read is skipped and reported in `errors`.
pub fn decode_snapshot(text: &str) -> Result<ItemSnapshot, serde_json::Error> {
    let (records, mut errors) = match serde_json::from_str(text)? {
        SnapshotDocument::List(records) => (records, Vec::new()),
        SnapshotDocument::Snapshot { dags, errors } => {
            let errors = errors
                .unwrap_or_default()
                .into_iter()
                .filter_map(|value| match value {
                    serde_json::Value::String(text) => Some(text),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            (dags.unwrap_or_default(), errors)
        }
    };

    let mut dags = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<DagLeaf>(record) {
            Ok(dag) => dags.push(dag),
            Err(err) => {
                tracing::warn!(record = idx, error = %err, "skipping malformed DAG record");
                errors.push(format!("record {idx}: {err}"));
            }
        }
    }
    Ok(ItemSnapshot { dags, errors })
}

/// Shared, mutable snapshot for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryItemSource {
    snapshot: Arc<Mutex<Option<ItemSnapshot>>>,
}

impl InMemoryItemSource {
    pub fn new(snapshot: ItemSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(Some(snapshot))),
        }
    }

    /// Replace the snapshot; `None` makes subsequent loads fail.
    pub fn set(&self, snapshot: Option<ItemSnapshot>) {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = snapshot;
        }
    }
}

impl ItemSource for InMemoryItemSource {
    fn load(&self) -> Result<ItemSnapshot, SourceError> {
        let guard = self.snapshot.lock().map_err(|_| SourceError::Unavailable)?;
        guard.clone().ok_or(SourceError::Unavailable)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
