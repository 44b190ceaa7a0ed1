use std::path::{Path, PathBuf};

use async_trait::async_trait;
use starlift_utils::{Record, StarliftResult, TaskError};

use crate::connections::traits::ObjectStore;

/// Object store backed by a local directory tree. A location resolves to a
/// file, a directory of files, or a file-name prefix; files hold either a
/// JSON array of objects or newline-delimited JSON.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn matching_files(&self, location: &str) -> StarliftResult<Vec<PathBuf>> {
        let path = self.root.join(location);

        if path.is_file() {
            return Ok(vec![path]);
        }

        // Directory: every regular file inside, sorted for determinism.
        // Otherwise fall back to treating the last path segment as a prefix.
        let (dir, prefix) = if path.is_dir() {
            (path, String::new())
        } else {
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root.clone());
            let prefix = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (dir, prefix)
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            TaskError::SourceUnavailable(format!("cannot list `{}`: {e}", dir.display()))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            TaskError::SourceUnavailable(format!("cannot list `{}`: {e}", dir.display()))
        })? {
            let entry_path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry_path.is_file() && name.starts_with(&prefix) {
                files.push(entry_path);
            }
        }

        if files.is_empty() {
            return Err(TaskError::SourceUnavailable(format!(
                "no files under location `{location}`"
            )));
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn fetch_records(&self, location: &str) -> StarliftResult<Vec<Record>> {
        let mut rows = Vec::new();
        for file in self.matching_files(location).await? {
            let content = tokio::fs::read_to_string(&file).await.map_err(|e| {
                TaskError::SourceUnavailable(format!("cannot read `{}`: {e}", file.display()))
            })?;
            rows.extend(parse_records(&content, &file)?);
        }
        Ok(rows)
    }

    async fn fetch_descriptor(&self, location: &str) -> StarliftResult<serde_json::Value> {
        let path = self.root.join(location);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            TaskError::SourceUnavailable(format!("cannot read `{}`: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            TaskError::SchemaMismatch(format!("descriptor `{}` is not valid JSON: {e}", location))
        })
    }
}

fn parse_records(content: &str, file: &Path) -> StarliftResult<Vec<Record>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let values: Vec<serde_json::Value> = serde_json::from_str(trimmed).map_err(|e| {
            TaskError::SchemaMismatch(format!("`{}` is not a JSON array: {e}", file.display()))
        })?;
        values.into_iter().map(|v| into_record(v, file)).collect()
    } else {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
                    TaskError::SchemaMismatch(format!(
                        "`{}` holds a malformed JSON line: {e}",
                        file.display()
                    ))
                })?;
                into_record(value, file)
            })
            .collect()
    }
}

fn into_record(value: serde_json::Value, file: &Path) -> StarliftResult<Record> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(TaskError::SchemaMismatch(format!(
            "`{}` holds a non-object record: {other}",
            file.display()
        ))),
    }
}
