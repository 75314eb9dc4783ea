// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Merge-on-write JSON persistence
//!
//! Results saved to disk are merged with whatever the file already holds, so a
//! batch that looks up a handful of tokens never discards earlier lookups.

use std::{
    collections::{BTreeMap, HashSet},
    hash::Hash,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use api_client::ApiError;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

/// Errors from reading or writing persisted results
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum PersistError {
    /// Target directory does not exist
    #[error("save directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },

    /// File name does not end in `.json`
    #[error("invalid filename '{filename}': must end with .json")]
    InvalidFilename { filename: String },

    /// Filesystem error
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Existing file content is not the expected JSON shape
    #[error("invalid JSON in {}: {message}", path.display())]
    Json { path: PathBuf, message: String },
}

impl From<PersistError> for ApiError {
    fn from(error: PersistError) -> Self {
        Self::Storage {
            message: error.to_string(),
        }
    }
}

/// Join `filename` onto `save_dir` (or the working directory)
///
/// # Errors
///
/// Returns an error if `filename` does not end in `.json` or `save_dir` is
/// not an existing directory
pub fn resolve_save_path(save_dir: Option<&Path>, filename: &str) -> Result<PathBuf, PersistError> {
    if !filename.ends_with(".json") || filename.len() == ".json".len() {
        return Err(PersistError::InvalidFilename {
            filename: filename.to_string(),
        });
    }
    match save_dir {
        Some(dir) if !dir.is_dir() => Err(PersistError::MissingDirectory {
            path: dir.to_path_buf(),
        }),
        Some(dir) => Ok(dir.join(filename)),
        None => Ok(PathBuf::from(filename)),
    }
}

/// Overlay `entries` onto the JSON object stored at `path` and write it back
///
/// A missing file or a stored `null` counts as an empty object. Returns the
/// merged map that was written.
pub async fn merge_json_map(
    path: &Path,
    entries: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>, PersistError> {
    let mut merged: BTreeMap<String, Value> = match read_existing(path).await? {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(existing)) => existing.into_iter().collect(),
        Some(other) => {
            return Err(PersistError::Json {
                path: path.to_path_buf(),
                message: format!("expected an object, found {}", json_kind(&other)),
            });
        }
    };

    let previous = merged.len();
    merged.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
    debug!(
        path = %path.display(),
        previous,
        merged = merged.len(),
        "merged JSON map"
    );

    write_pretty(path, &Value::Object(merged.clone().into_iter().collect::<Map<_, _>>())).await?;
    info!(path = %path.display(), entries = merged.len(), "saved JSON map");
    Ok(merged)
}

/// Merge `entries` with the JSON list stored at `path` and write it back
///
/// New entries win; stored entries are kept only when their key is absent from
/// `entries`. The result is sorted by key. Entries for which `key_fn` returns
/// `None` sort last in their original order.
pub async fn merge_json_list<K, F>(
    path: &Path,
    entries: Vec<Value>,
    key_fn: F,
) -> Result<Vec<Value>, PersistError>
where
    K: Ord + Hash,
    F: Fn(&Value) -> Option<K>,
{
    let existing = match read_existing(path).await? {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(PersistError::Json {
                path: path.to_path_buf(),
                message: format!("expected a list, found {}", json_kind(&other)),
            });
        }
    };

    let new_keys: HashSet<K> = entries.iter().filter_map(&key_fn).collect();
    let mut merged = entries;
    merged.extend(
        existing
            .into_iter()
            .filter(|item| key_fn(item).is_none_or(|k| !new_keys.contains(&k))),
    );
    // stable sort keeps keyless entries in order; None sorts after Some
    merged.sort_by(|a, b| match (key_fn(a), key_fn(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    write_pretty(path, &Value::Array(merged.clone())).await?;
    info!(path = %path.display(), entries = merged.len(), "saved JSON list");
    Ok(merged)
}

async fn read_existing(path: &Path) -> Result<Option<Value>, PersistError> {
    match fs::read_to_string(path).await {
        Ok(text) if text.trim().is_empty() => Ok(None),
        Ok(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| PersistError::Json {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PersistError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn write_pretty(path: &Path, value: &Value) -> Result<(), PersistError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| PersistError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, text)
        .await
        .map_err(|source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
