//! Workspace wiki connector.
//!
//! Walks the page tree of a hosted wiki (Notion-compatible API) starting
//! from a configured root page: fetches each page, paginates its block
//! listing, renders blocks to plain text, and queues child pages for the
//! next round. Read-only against the wiki.
//!
//! A failure on the root page (bad credentials, unreachable host) fails the
//! whole connector; failures on individual child pages are logged and the
//! page is skipped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

use crate::config::WikiConfig;
use crate::connector::SourceConnector;
use crate::error::{Error, Result};
use crate::models::{Document, SourceKind};

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const API_VERSION: &str = "2022-06-28";
const TIMEOUT_SECS: u64 = 30;

pub struct WikiConnector {
    api_key: String,
    root_page_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl WikiConnector {
    pub fn new(config: &WikiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            root_page_id: config.root_page_id.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Notion-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("wiki API unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Connection(format!(
                "wiki API error {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Connection(format!("invalid wiki API response: {}", e)))
    }

    /// Fetch a page object, returning its title and last-edited time.
    async fn get_page(&self, page_id: &str) -> Result<(String, DateTime<Utc>)> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        let page = self.get_json(&url).await?;

        let title = extract_title(&page);
        let edited = page
            .get("last_edited_time")
            .and_then(|t| t.as_str())
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok((title, edited))
    }

    /// List all blocks under a page or block, following pagination cursors.
    async fn list_blocks(&self, block_id: &str) -> Result<Vec<serde_json::Value>> {
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let url = match &cursor {
                Some(c) => format!(
                    "{}/blocks/{}/children?start_cursor={}",
                    self.base_url, block_id, c
                ),
                None => format!("{}/blocks/{}/children", self.base_url, block_id),
            };

            let page = self.get_json(&url).await?;

            if let Some(items) = page.get("results").and_then(|r| r.as_array()) {
                results.extend(items.iter().cloned());
            }

            let has_more = page
                .get("has_more")
                .and_then(|h| h.as_bool())
                .unwrap_or(false);
            if !has_more {
                break;
            }
            cursor = page
                .get("next_cursor")
                .and_then(|c| c.as_str())
                .map(|c| c.to_string());
            if cursor.is_none() {
                break;
            }
        }

        Ok(results)
    }

    /// Render one page to a document, collecting child page ids into
    /// `pending` as they are discovered.
    async fn render_page(&self, page_id: &str, pending: &mut Vec<String>) -> Result<Document> {
        let (title, updated_at) = self.get_page(page_id).await?;
        let blocks = self.list_blocks(page_id).await?;

        let mut parts: Vec<String> = Vec::new();

        for block in &blocks {
            let block_type = block.get("type").and_then(|t| t.as_str()).unwrap_or("");

            if block_type == "child_page" {
                if let Some(id) = block.get("id").and_then(|i| i.as_str()) {
                    pending.push(id.to_string());
                }
            }

            if let Some(text) = block_to_text(block) {
                if !text.is_empty() {
                    parts.push(text);
                }
            }

            // One level of nested content: render children of container
            // blocks indented, and pick up child pages hiding inside them.
            let has_children = block
                .get("has_children")
                .and_then(|h| h.as_bool())
                .unwrap_or(false);
            if has_children && block_type != "child_page" {
                let block_id = block.get("id").and_then(|i| i.as_str()).unwrap_or("");
                match self.list_blocks(block_id).await {
                    Ok(children) => {
                        for child in &children {
                            let child_type =
                                child.get("type").and_then(|t| t.as_str()).unwrap_or("");
                            if child_type == "child_page" {
                                if let Some(id) = child.get("id").and_then(|i| i.as_str()) {
                                    pending.push(id.to_string());
                                }
                            }
                            if let Some(text) = block_to_text(child) {
                                if !text.is_empty() {
                                    let indented: String = text
                                        .lines()
                                        .map(|l| format!("  {}", l))
                                        .collect::<Vec<_>>()
                                        .join("\n");
                                    parts.push(indented);
                                }
                            }
                        }
                    }
                    Err(e) => warn!(block = block_id, "skipping nested blocks: {}", e),
                }
            }
        }

        Ok(Document {
            source: SourceKind::Wiki,
            source_id: page_id.to_string(),
            title: Some(title.clone()),
            updated_at,
            body: format!("# {}\n\n{}", title, parts.join("\n\n")),
        })
    }
}

#[async_trait]
impl SourceConnector for WikiConnector {
    fn name(&self) -> &str {
        "wiki"
    }

    async fn fetch(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        let mut pending = vec![self.root_page_id.clone()];
        let mut seen: HashSet<String> = HashSet::new();

        while let Some(page_id) = pending.pop() {
            if !seen.insert(page_id.clone()) {
                continue;
            }

            let is_root = page_id == self.root_page_id;
            match self.render_page(&page_id, &mut pending).await {
                Ok(doc) => docs.push(doc),
                // Bad credentials or an unreachable host surface on the
                // root page; child pages may legitimately be inaccessible.
                Err(e) if is_root => return Err(e),
                Err(e) => warn!(page = %page_id, "skipping wiki page: {}", e),
            }
        }

        docs.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(docs)
    }
}

/// Extract the title from a page object's `properties`.
fn extract_title(page: &serde_json::Value) -> String {
    if let Some(props) = page.get("properties").and_then(|p| p.as_object()) {
        for prop in props.values() {
            if prop.get("type").and_then(|t| t.as_str()) == Some("title") {
                if let Some(rich) = prop.get("title") {
                    let text = rich_text_to_plain(rich);
                    if !text.is_empty() {
                        return text;
                    }
                }
            }
        }
    }
    "Untitled".to_string()
}

/// Convert a single block to text. Returns `None` for unsupported types.
fn block_to_text(block: &serde_json::Value) -> Option<String> {
    let block_type = block.get("type").and_then(|t| t.as_str())?;
    let payload = block.get(block_type)?;
    let rich = || rich_text_to_plain(payload.get("rich_text").unwrap_or(&serde_json::Value::Null));

    let text = match block_type {
        "paragraph" => rich(),
        "heading_1" => format!("# {}", rich()),
        "heading_2" => format!("## {}", rich()),
        "heading_3" => format!("### {}", rich()),
        "bulleted_list_item" => format!("- {}", rich()),
        "numbered_list_item" => format!("1. {}", rich()),
        "to_do" => {
            let checked = payload
                .get("checked")
                .and_then(|c| c.as_bool())
                .unwrap_or(false);
            let mark = if checked { "[x]" } else { "[ ]" };
            format!("{} {}", mark, rich())
        }
        "toggle" => format!("> {}", rich()),
        "code" => {
            let language = payload
                .get("language")
                .and_then(|l| l.as_str())
                .unwrap_or("");
            format!("```{}\n{}\n```", language, rich())
        }
        "quote" => format!("> {}", rich()),
        "callout" => {
            let emoji = payload
                .get("icon")
                .and_then(|i| i.get("emoji"))
                .and_then(|e| e.as_str())
                .unwrap_or("");
            format!("{} {}", emoji, rich()).trim_start().to_string()
        }
        "divider" => "---".to_string(),
        "child_page" => {
            let title = payload
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or("Untitled");
            format!("[[Page: {}]]", title)
        }
        _ => return None,
    };

    Some(text)
}

/// Join a rich text array into plain text.
fn rich_text_to_plain(rich_text: &serde_json::Value) -> String {
    match rich_text.as_array() {
        Some(items) => items
            .iter()
            .filter_map(|t| t.get("plain_text").and_then(|p| p.as_str()))
            .collect::<Vec<_>>()
            .join(" "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::future::IntoFuture;

    fn rich(text: &str) -> serde_json::Value {
        json!([{ "plain_text": text }])
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, app).into_future());
        format!("http://{}", addr)
    }

    fn connector_at(base_url: String) -> WikiConnector {
        WikiConnector {
            api_key: "test-key".to_string(),
            root_page_id: "root".to_string(),
            base_url,
            client: reqwest::Client::new(),
        }
    }

    #[tokio::test]
    async fn test_list_blocks_follows_pagination_cursor() {
        let app = Router::new().route(
            "/blocks/{id}/children",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let body = match params.get("start_cursor").map(|s| s.as_str()) {
                    None => json!({
                        "results": [{
                            "type": "paragraph",
                            "paragraph": { "rich_text": [{ "plain_text": "first" }] }
                        }],
                        "has_more": true,
                        "next_cursor": "cursor-2"
                    }),
                    Some("cursor-2") => json!({
                        "results": [{
                            "type": "paragraph",
                            "paragraph": { "rich_text": [{ "plain_text": "second" }] }
                        }],
                        "has_more": false,
                        "next_cursor": null
                    }),
                    Some(_) => json!({ "results": [], "has_more": false, "next_cursor": null }),
                };
                Json(body)
            }),
        );

        let connector = connector_at(serve(app).await);
        let blocks = connector.list_blocks("root").await.unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(block_to_text(&blocks[0]).unwrap(), "first");
        assert_eq!(block_to_text(&blocks[1]).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_unauthorized_is_connection_error() {
        let app = Router::new().route(
            "/blocks/{id}/children",
            get(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad token") }),
        );

        let connector = connector_at(serve(app).await);
        match connector.list_blocks("root").await {
            Err(Error::Connection(msg)) => assert!(msg.contains("401"), "msg: {}", msg),
            other => panic!("expected Connection error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_title() {
        let page = json!({
            "properties": {
                "Name": { "type": "title", "title": [{ "plain_text": "Roadmap" }] },
                "Tags": { "type": "multi_select" }
            }
        });
        assert_eq!(extract_title(&page), "Roadmap");
    }

    #[test]
    fn test_extract_title_missing() {
        assert_eq!(extract_title(&json!({})), "Untitled");
        let empty = json!({ "properties": { "Name": { "type": "title", "title": [] } } });
        assert_eq!(extract_title(&empty), "Untitled");
    }

    #[test]
    fn test_paragraph_and_headings() {
        let para = json!({ "type": "paragraph", "paragraph": { "rich_text": rich("hello") } });
        assert_eq!(block_to_text(&para).unwrap(), "hello");

        let h2 = json!({ "type": "heading_2", "heading_2": { "rich_text": rich("Plan") } });
        assert_eq!(block_to_text(&h2).unwrap(), "## Plan");
    }

    #[test]
    fn test_list_items() {
        let bullet = json!({ "type": "bulleted_list_item",
            "bulleted_list_item": { "rich_text": rich("first") } });
        assert_eq!(block_to_text(&bullet).unwrap(), "- first");

        let numbered = json!({ "type": "numbered_list_item",
            "numbered_list_item": { "rich_text": rich("second") } });
        assert_eq!(block_to_text(&numbered).unwrap(), "1. second");
    }

    #[test]
    fn test_to_do_checked_state() {
        let done = json!({ "type": "to_do",
            "to_do": { "rich_text": rich("ship it"), "checked": true } });
        assert_eq!(block_to_text(&done).unwrap(), "[x] ship it");

        let open = json!({ "type": "to_do",
            "to_do": { "rich_text": rich("write docs"), "checked": false } });
        assert_eq!(block_to_text(&open).unwrap(), "[ ] write docs");
    }

    #[test]
    fn test_code_block() {
        let code = json!({ "type": "code",
            "code": { "rich_text": rich("fn main() {}"), "language": "rust" } });
        assert_eq!(block_to_text(&code).unwrap(), "```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_callout_and_divider() {
        let callout = json!({ "type": "callout",
            "callout": { "rich_text": rich("heads up"), "icon": { "emoji": "⚠️" } } });
        assert_eq!(block_to_text(&callout).unwrap(), "⚠️ heads up");

        let divider = json!({ "type": "divider", "divider": {} });
        assert_eq!(block_to_text(&divider).unwrap(), "---");
    }

    #[test]
    fn test_child_page_reference() {
        let child = json!({ "type": "child_page", "child_page": { "title": "Sub page" } });
        assert_eq!(block_to_text(&child).unwrap(), "[[Page: Sub page]]");
    }

    #[test]
    fn test_unsupported_block_is_none() {
        let embed = json!({ "type": "embed", "embed": { "url": "https://x" } });
        assert!(block_to_text(&embed).is_none());
    }

    #[test]
    fn test_rich_text_joins_segments() {
        let rich = json!([
            { "plain_text": "one" },
            { "plain_text": "two" }
        ]);
        assert_eq!(rich_text_to_plain(&rich), "one two");
        assert_eq!(rich_text_to_plain(&serde_json::Value::Null), "");
    }
}
