//! Local files connector.
//!
//! Walks the configured notes directory and renders each supported file to
//! plain text. `.txt` and `.md` files are taken verbatim with the file name
//! prepended as a heading; `.json` files are flattened into readable
//! indented text. Everything else is skipped.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::connector::SourceConnector;
use crate::error::{Error, Result};
use crate::models::{Document, SourceKind};

const INCLUDE_GLOBS: &[&str] = &["**/*.txt", "**/*.md", "**/*.json"];
const EXCLUDE_GLOBS: &[&str] = &["**/.git/**", "**/node_modules/**", "**/.*"];

pub struct LocalFileConnector {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
}

impl LocalFileConnector {
    pub fn new(root: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            include: build_globset(INCLUDE_GLOBS)?,
            exclude: build_globset(EXCLUDE_GLOBS)?,
        })
    }
}

#[async_trait]
impl SourceConnector for LocalFileConnector {
    fn name(&self) -> &str {
        "files"
    }

    async fn fetch(&self) -> Result<Vec<Document>> {
        if !self.root.exists() {
            return Err(Error::NotFound(format!(
                "local files directory does not exist: {}",
                self.root.display()
            )));
        }

        let mut docs = Vec::new();

        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if self.exclude.is_match(&rel_str) || !self.include.is_match(&rel_str) {
                continue;
            }

            match render_file(path) {
                Ok(Some(body)) => {
                    docs.push(Document {
                        source: SourceKind::LocalFile,
                        source_id: rel_str,
                        title: path.file_name().map(|n| n.to_string_lossy().to_string()),
                        updated_at: modified_time(path),
                        body,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(file = %path.display(), "skipping file: {}", e);
                }
            }
        }

        // Sort for deterministic ordering
        docs.sort_by(|a, b| a.source_id.cmp(&b.source_id));

        Ok(docs)
    }
}

/// Render a file to indexable text, or `None` for unsupported extensions.
fn render_file(path: &Path) -> anyhow::Result<Option<String>> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "md" => {
            let content = std::fs::read_to_string(path)?;
            Ok(Some(format!("# {}\n\n{}", name, content)))
        }
        "json" => {
            let content = std::fs::read_to_string(path)?;
            let value: serde_json::Value = serde_json::from_str(&content)?;
            Ok(Some(format!(
                "# {}\n\n{}",
                name,
                format_json_as_text(&value, 0)
            )))
        }
        _ => Ok(None),
    }
}

/// Flatten a JSON value into readable indented text, two spaces per level.
fn format_json_as_text(value: &serde_json::Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let mut out = String::new();

    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                match val {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        out.push_str(&format!("{}{}:\n", pad, key));
                        out.push_str(&format_json_as_text(val, indent + 1));
                    }
                    _ => out.push_str(&format!("{}{}: {}", pad, key, scalar_to_text(val))),
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                match item {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        out.push_str(&format!("{}-\n", pad));
                        out.push_str(&format_json_as_text(item, indent + 1));
                    }
                    _ => out.push_str(&format!("{}- {}", pad, scalar_to_text(item))),
                }
            }
        }
        _ => out.push_str(&format!("{}{}", pad, scalar_to_text(value))),
    }

    out
}

fn scalar_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => format!("{}\n", s),
        other => format!("{}\n", other),
    }
}

fn modified_time(path: &Path) -> DateTime<Utc> {
    let secs = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

fn build_globset(patterns: &[&str]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_root_is_not_found() {
        let connector = LocalFileConnector::new(Path::new("/nonexistent/notes")).unwrap();
        match connector.fetch().await {
            Err(Error::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|d| d.len())),
        }
    }

    #[tokio::test]
    async fn test_fetch_supported_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "plain text").unwrap();
        fs::write(tmp.path().join("b.md"), "# heading\nbody").unwrap();
        fs::write(tmp.path().join("c.json"), r#"{"k": "v"}"#).unwrap();
        fs::write(tmp.path().join("skip.bin"), [0u8, 1, 2]).unwrap();

        let connector = LocalFileConnector::new(tmp.path()).unwrap();
        let docs = connector.fetch().await.unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.md", "c.json"]);
        assert!(docs[0].body.starts_with("# a.txt\n\nplain text"));
        assert!(docs[2].body.contains("k: v"));
    }

    #[tokio::test]
    async fn test_invalid_json_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad.json"), "{not json").unwrap();
        fs::write(tmp.path().join("good.txt"), "fine").unwrap();

        let connector = LocalFileConnector::new(tmp.path()).unwrap();
        let docs = connector.fetch().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "good.txt");
    }

    #[tokio::test]
    async fn test_subdirectories_use_relative_ids() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("nested.txt"), "deep").unwrap();

        let connector = LocalFileConnector::new(tmp.path()).unwrap();
        let docs = connector.fetch().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, format!("sub{}nested.txt", std::path::MAIN_SEPARATOR));
    }

    #[test]
    fn test_format_json_nested() {
        let value = json!({
            "name": "release plan",
            "steps": [
                { "id": 1, "done": true },
                "ship it"
            ]
        });
        let text = format_json_as_text(&value, 0);
        assert!(text.contains("name: release plan\n"));
        assert!(text.contains("steps:\n"));
        assert!(text.contains("  -\n"));
        assert!(text.contains("    id: 1\n"));
        assert!(text.contains("  - ship it\n"));
    }
}
