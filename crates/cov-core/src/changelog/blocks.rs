//! Splitting an opaque content snapshot into comparable text blocks.
//!
//! Three snapshot shapes are recognised:
//! - editor JSON (`{"type": "doc", "content": [...]}`): one block per top-level node
//! - a JSON array of strings: one block per string
//! - anything else: UTF-8 text (lossy) split on blank lines
//!
//! Blocks that are empty after trimming are dropped in every shape.

use serde_json::Value;

/// Extract the text blocks of `snapshot`.
#[must_use]
pub fn extract_blocks(snapshot: &[u8]) -> Vec<String> {
    let blocks = match serde_json::from_slice::<Value>(snapshot) {
        Ok(Value::Object(doc)) if doc.get("type").and_then(Value::as_str) == Some("doc") => doc
            .get("content")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().map(node_text).collect())
            .unwrap_or_default(),
        Ok(Value::Array(items)) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => paragraphs(&String::from_utf8_lossy(snapshot)),
    };
    blocks
        .into_iter()
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .collect()
}

/// Gather the text under an editor node.
///
/// Inline children are concatenated; block children are separated by newlines.
fn node_text(node: &Value) -> String {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    if matches!(
        node.get("type").and_then(Value::as_str),
        Some("hardBreak" | "hard_break")
    ) {
        return "\n".to_string();
    }
    let Some(children) = node.get("content").and_then(Value::as_array) else {
        return String::new();
    };
    let inline = children
        .iter()
        .all(|c| c.get("text").is_some() || c.get("content").is_none());
    let parts: Vec<String> = children.iter().map(node_text).collect();
    if inline {
        parts.concat()
    } else {
        parts.join("\n")
    }
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}
