use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use meridian_core::paths::expand_path;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::host::ServiceHost;

/// Real (not stubbed) filesystem backend for `system.file.*` — unlike the
/// AI host families, path resolution and file I/O are in scope; there is
/// no external model to abstract away.
pub struct FilesystemHost;

impl Default for FilesystemHost {
    fn default() -> Self {
        Self
    }
}

fn resolve(payload: &Value, field: &str, working_directory: &std::path::Path) -> Result<PathBuf> {
    let raw = payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| MeridianError::InvalidInput(format!("missing '{field}'")))?;
    Ok(expand_path(raw, working_directory))
}

fn working_dir(payload: &Value) -> PathBuf {
    payload
        .get("working_directory")
        .and_then(Value::as_str)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
}

#[async_trait]
impl ServiceHost for FilesystemHost {
    fn prefix(&self) -> &str {
        "system.file"
    }

    async fn info(&self) -> Value {
        json!({ "capabilities": ["search", "read", "write", "create", "move", "delete"] })
    }

    async fn handle(&self, op: &str, payload: Value) -> Result<Value> {
        let cwd = working_dir(&payload);
        match op {
            "search" => {
                let query = payload
                    .get("query")
                    .and_then(Value::as_str)
                    .ok_or_else(|| MeridianError::InvalidInput("missing 'query'".into()))?;
                let root = payload
                    .get("path")
                    .and_then(Value::as_str)
                    .map(|p| expand_path(p, &cwd))
                    .unwrap_or(cwd.clone());
                let matches = search_dir(&root, query, 200);
                Ok(json!({ "matches": matches }))
            }
            "read" => {
                let path = resolve(&payload, "path", &cwd)?;
                let content = tokio::fs::read_to_string(&path).await.map_err(MeridianError::Io)?;
                Ok(json!({ "content": content, "path": path.display().to_string() }))
            }
            "write" => {
                let path = resolve(&payload, "path", &cwd)?;
                let content = payload
                    .get("content")
                    .and_then(Value::as_str)
                    .ok_or_else(|| MeridianError::InvalidInput("missing 'content'".into()))?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(MeridianError::Io)?;
                }
                tokio::fs::write(&path, content).await.map_err(MeridianError::Io)?;
                Ok(json!({ "path": path.display().to_string(), "bytes_written": content.len() }))
            }
            "create" => {
                let path = resolve(&payload, "path", &cwd)?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(MeridianError::Io)?;
                }
                let content = payload.get("content").and_then(Value::as_str).unwrap_or("");
                tokio::fs::write(&path, content).await.map_err(MeridianError::Io)?;
                Ok(json!({ "path": path.display().to_string() }))
            }
            "move" => {
                let from = resolve(&payload, "from", &cwd)?;
                let to = resolve(&payload, "to", &cwd)?;
                if let Some(parent) = to.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(MeridianError::Io)?;
                }
                tokio::fs::rename(&from, &to).await.map_err(MeridianError::Io)?;
                Ok(json!({ "from": from.display().to_string(), "to": to.display().to_string() }))
            }
            "delete" => {
                let path = resolve(&payload, "path", &cwd)?;
                let meta = tokio::fs::metadata(&path).await.map_err(MeridianError::Io)?;
                if meta.is_dir() {
                    tokio::fs::remove_dir_all(&path).await.map_err(MeridianError::Io)?;
                } else {
                    tokio::fs::remove_file(&path).await.map_err(MeridianError::Io)?;
                }
                Ok(json!({ "path": path.display().to_string(), "deleted": true }))
            }
            other => Err(MeridianError::InvalidInput(format!("unknown filesystem op '{other}'"))),
        }
    }
}

fn search_dir(root: &std::path::Path, query: &str, limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    let needle = query.to_lowercase();
    while let Some(dir) = stack.pop() {
        if out.len() >= limit {
            break;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            if out.len() >= limit {
                break;
            }
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name.contains(&needle) {
                out.push(path.display().to_string());
            }
            if path.is_dir() && !path.is_symlink() {
                stack.push(path);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let host = FilesystemHost;
        let cwd = dir.path().display().to_string();

        host.handle("write", json!({"path": "note.txt", "content": "hi", "working_directory": cwd}))
            .await
            .unwrap();
        let out = host
            .handle("read", json!({"path": "note.txt", "working_directory": cwd}))
            .await
            .unwrap();
        assert_eq!(out["content"], "hi");
    }

    #[tokio::test]
    async fn delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        let host = FilesystemHost;
        host.handle("write", json!({"path": "gone.txt", "content": "x", "working_directory": cwd.clone()}))
            .await
            .unwrap();

        host.handle("delete", json!({"path": "gone.txt", "working_directory": cwd})).await.unwrap();
        assert!(!dir.path().join("gone.txt").exists());
    }
}
