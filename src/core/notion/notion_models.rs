use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Notion rejects rich text runs longer than this.
pub const MAX_TEXT_RUN: usize = 2000;

#[derive(Debug, Error)]
pub enum NotionError {
    #[error("Notion API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Notion request failed: {0}")]
    Http(String),
    #[error("Unexpected Notion response: {0}")]
    Decode(String),
}

/// A page as returned by `pages.create` or `databases.query`.
///
/// Properties stay as raw JSON because their schema is owned by whoever built
/// the database, not by us.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionPage {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub properties: Value,
}

/// An attachment on a `files` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionFile {
    pub name: Option<String>,
    pub url: String,
}

impl NotionPage {
    /// Concatenated plain text of a `title` property.
    pub fn title_text(&self, property: &str) -> String {
        join_plain_text(&self.properties[property]["title"])
    }

    /// Concatenated plain text of a `rich_text` property.
    pub fn rich_text(&self, property: &str) -> String {
        join_plain_text(&self.properties[property]["rich_text"])
    }

    /// Plain text of only the first run of a title property, if any.
    pub fn first_title(&self, property: &str) -> Option<String> {
        first_plain_text(&self.properties[property]["title"])
    }

    pub fn first_rich_text(&self, property: &str) -> Option<String> {
        first_plain_text(&self.properties[property]["rich_text"])
    }

    /// First attachment of a `files` property. Notion-hosted files expose
    /// `file.url`, linked ones `external.url`.
    pub fn first_file(&self, property: &str) -> Option<NotionFile> {
        let file = self.properties[property]["files"].as_array()?.first()?;
        let url = file["file"]["url"]
            .as_str()
            .or_else(|| file["external"]["url"].as_str())?;
        Some(NotionFile {
            name: file["name"].as_str().map(str::to_string),
            url: url.to_string(),
        })
    }
}

fn join_plain_text(runs: &Value) -> String {
    runs.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|run| run["plain_text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn first_plain_text(runs: &Value) -> Option<String> {
    runs.as_array()?
        .first()?
        .get("plain_text")?
        .as_str()
        .map(str::to_string)
}

// -----------------------------------------------------------------------------
// Property value builders
// -----------------------------------------------------------------------------

pub fn title(content: &str) -> Value {
    json!({ "title": text_runs(content) })
}

pub fn rich_text(content: &str) -> Value {
    json!({ "rich_text": text_runs(content) })
}

pub fn url(value: &str) -> Value {
    json!({ "url": value })
}

pub fn number(value: f64) -> Value {
    json!({ "number": value })
}

pub fn select(name: &str) -> Value {
    json!({ "select": { "name": name } })
}

pub fn multi_select(names: &[String]) -> Value {
    let options: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
    json!({ "multi_select": options })
}

/// Split long text into runs Notion will accept, on char boundaries.
pub fn text_runs(content: &str) -> Vec<Value> {
    let chars: Vec<char> = content.chars().collect();
    if chars.is_empty() {
        return vec![json!({ "type": "text", "text": { "content": "" } })];
    }
    chars
        .chunks(MAX_TEXT_RUN)
        .map(|chunk| {
            let piece: String = chunk.iter().collect();
            json!({ "type": "text", "text": { "content": piece } })
        })
        .collect()
}

/// One paragraph block holding the whole document.
pub fn paragraph_block(content: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": text_runs(content) }
    })
}

/// Where a new page goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    Database(String),
    Page(String),
}

impl Parent {
    pub fn to_json(&self) -> Value {
        match self {
            Parent::Database(id) => json!({ "database_id": id }),
            Parent::Page(id) => json!({ "page_id": id }),
        }
    }
}

pub fn page_request(parent: &Parent, properties: Map<String, Value>, children: Vec<Value>) -> Value {
    let mut body = json!({
        "parent": parent.to_json(),
        "properties": Value::Object(properties),
    });
    if !children.is_empty() {
        body["children"] = Value::Array(children);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(properties: Value) -> NotionPage {
        NotionPage {
            id: "p1".to_string(),
            url: None,
            properties,
        }
    }

    #[test]
    fn title_text_concatenates_runs() {
        let page = page(json!({
            "Name": { "title": [{ "plain_text": "Hello " }, { "plain_text": "world" }] }
        }));
        assert_eq!(page.title_text("Name"), "Hello world");
        assert_eq!(page.first_title("Name").as_deref(), Some("Hello "));
        assert_eq!(page.title_text("Missing"), "");
    }

    #[test]
    fn first_file_prefers_hosted_then_external() {
        let hosted = page(json!({
            "File": { "files": [{ "name": "a.png", "file": { "url": "https://hosted/a" } }] }
        }));
        assert_eq!(
            hosted.first_file("File"),
            Some(NotionFile {
                name: Some("a.png".to_string()),
                url: "https://hosted/a".to_string()
            })
        );

        let external = page(json!({
            "File": { "files": [{ "external": { "url": "https://ext/b" } }] }
        }));
        assert_eq!(external.first_file("File").unwrap().url, "https://ext/b");

        let empty = page(json!({ "File": { "files": [] } }));
        assert!(empty.first_file("File").is_none());
    }

    #[test]
    fn long_text_is_split_into_runs() {
        let text = "x".repeat(MAX_TEXT_RUN * 2 + 5);
        let runs = text_runs(&text);
        assert_eq!(runs.len(), 3);
        assert_eq!(
            runs[2]["text"]["content"].as_str().unwrap().chars().count(),
            5
        );
    }

    #[test]
    fn long_property_values_are_split_too() {
        let quote = "q".repeat(MAX_TEXT_RUN + 1);
        let prop = rich_text(&quote);
        let runs = prop["rich_text"].as_array().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1]["text"]["content"], "q");

        assert_eq!(title("Launch")["title"][0]["text"]["content"], "Launch");
        assert_eq!(title(&quote)["title"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn page_request_omits_empty_children() {
        let body = page_request(&Parent::Page("abc".to_string()), Map::new(), vec![]);
        assert_eq!(body["parent"]["page_id"], "abc");
        assert!(body.get("children").is_none());
    }
}
