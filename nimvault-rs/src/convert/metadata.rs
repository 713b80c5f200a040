//! Note metadata (`metadata.json`) and the YAML preamble built from it.
//!
//! ```json
//! {"title": "Trip", "tags": ["travel"], "createdAt": 1609459200,
//!  "updatedAt": 1609545600, "parents": ["Personal"], "color": "red"}
//! ```

use crate::error::{Error, Result};
use crate::frontmatter::render_frontmatter;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Metadata as exported, every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    title: Option<String>,
    tags: Option<Vec<String>>,
    created_at: Option<f64>,
    updated_at: Option<f64>,
    parents: Option<Vec<String>>,
    color: Option<String>,
}

/// Resolved metadata for one note bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMetadata {
    /// Bundle identifier (the bundle directory name).
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    /// ISO-8601 creation time, UTC.
    pub created: Option<String>,
    pub updated: Option<String>,
    /// Folder path, outermost first, unsanitized.
    pub parents: Vec<String>,
    pub color: Option<String>,
}

impl NoteMetadata {
    /// Metadata for a bundle without a usable descriptor.
    pub fn defaults(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: default_title(id),
            tags: Vec::new(),
            created: None,
            updated: None,
            parents: Vec::new(),
            color: None,
        }
    }

    /// Parse a `metadata.json` document.
    pub fn from_json(id: &str, json: &str) -> Result<Self> {
        let raw: RawMetadata = serde_json::from_str(json)?;

        let title = raw
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| default_title(id));

        Ok(Self {
            id: id.to_string(),
            title,
            tags: raw.tags.unwrap_or_default(),
            created: raw.created_at.and_then(timestamp_to_iso),
            updated: raw.updated_at.and_then(timestamp_to_iso),
            parents: raw.parents.unwrap_or_default(),
            color: raw.color.filter(|c| !c.is_empty()),
        })
    }

    /// Read `path`, falling back to defaults when it is missing or malformed.
    pub fn load(id: &str, path: &Path) -> Self {
        if !path.is_file() {
            return Self::defaults(id);
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|json| Self::from_json(id, &json));
        match parsed {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Metadata error for {}: {}", id, e);
                Self::defaults(id)
            }
        }
    }

    pub fn preamble(&self) -> Preamble<'_> {
        Preamble {
            title: &self.title,
            tags: &self.tags,
            created: self.created.as_deref(),
            updated: self.updated.as_deref(),
            color: self.color.as_deref(),
            id: &self.id,
        }
    }
}

fn default_title(id: &str) -> String {
    format!("Untitled-{}", id)
}

/// Unix seconds to `YYYY-MM-DDTHH:MM:SS` (UTC). Zero and out-of-range
/// values yield `None`.
pub fn timestamp_to_iso(seconds: f64) -> Option<String> {
    if seconds == 0.0 || !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp(seconds.trunc() as i64, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// The YAML header written at the top of every converted note.
#[derive(Debug, Serialize)]
pub struct Preamble<'a> {
    pub title: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<&'a str>,
    #[serde(rename = "nimbus-color", skip_serializing_if = "Option::is_none")]
    pub color: Option<&'a str>,
    #[serde(rename = "nimbus-id")]
    pub id: &'a str,
}

impl Preamble<'_> {
    /// Render as a `---` delimited block ending in a newline.
    pub fn render(&self) -> Result<String> {
        render_frontmatter(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_yaml::Value;
    use tempfile::TempDir;

    fn keys(rendered: &str) -> Vec<String> {
        let yaml = rendered
            .strip_prefix("---\n")
            .and_then(|s| s.strip_suffix("---\n"))
            .unwrap();
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        value
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_full_metadata() {
        let json = r#"{"title": "Trip: Day 1", "tags": ["travel", "2021"],
            "createdAt": 1609459200, "updatedAt": 1609545600,
            "parents": ["Personal", "Travel"], "color": "red"}"#;
        let meta = NoteMetadata::from_json("abc123", json).unwrap();

        assert_eq!(meta.title, "Trip: Day 1");
        assert_eq!(meta.tags, vec!["travel", "2021"]);
        assert_eq!(meta.created.as_deref(), Some("2021-01-01T00:00:00"));
        assert_eq!(meta.updated.as_deref(), Some("2021-01-02T00:00:00"));
        assert_eq!(meta.parents, vec!["Personal", "Travel"]);
        assert_eq!(meta.color.as_deref(), Some("red"));
    }

    #[test]
    fn test_missing_fields_default() {
        let meta = NoteMetadata::from_json("n1", "{}").unwrap();
        assert_eq!(meta, NoteMetadata::defaults("n1"));
        assert_eq!(meta.title, "Untitled-n1");
    }

    #[test]
    fn test_zero_timestamps_and_empty_color_dropped() {
        let meta =
            NoteMetadata::from_json("n", r#"{"createdAt": 0, "updatedAt": null, "color": ""}"#).unwrap();
        assert_eq!(meta.created, None);
        assert_eq!(meta.updated, None);
        assert_eq!(meta.color, None);
    }

    #[test]
    fn test_out_of_range_timestamp() {
        assert_eq!(timestamp_to_iso(1e30), None);
        assert_eq!(timestamp_to_iso(f64::NAN), None);
        assert_eq!(timestamp_to_iso(86400.9), Some("1970-01-02T00:00:00".to_string()));
    }

    #[test]
    fn test_load_degrades_on_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, "{not json").unwrap();

        assert_eq!(NoteMetadata::load("x", &path), NoteMetadata::defaults("x"));
        assert_eq!(
            NoteMetadata::load("x", &dir.path().join("missing.json")),
            NoteMetadata::defaults("x")
        );
    }

    #[test]
    fn test_preamble_key_order() {
        let meta = NoteMetadata {
            id: "id1".to_string(),
            title: "T".to_string(),
            tags: vec!["a".to_string()],
            created: Some("2021-01-01T00:00:00".to_string()),
            updated: Some("2021-01-02T00:00:00".to_string()),
            parents: Vec::new(),
            color: Some("blue".to_string()),
        };
        let rendered = meta.preamble().render().unwrap();
        assert_eq!(
            keys(&rendered),
            vec!["title", "tags", "created", "updated", "nimbus-color", "nimbus-id"]
        );
    }

    #[test]
    fn test_preamble_omits_absent_fields() {
        let rendered = NoteMetadata::defaults("xyz").preamble().render().unwrap();
        assert_eq!(keys(&rendered), vec!["title", "nimbus-id"]);
        assert!(rendered.starts_with("---\n"));
        assert!(rendered.ends_with("---\n"));
    }

    #[test]
    fn test_preamble_escapes_title() {
        let mut meta = NoteMetadata::defaults("q");
        meta.title = "He said \"hi\": # not a comment".to_string();
        let rendered = meta.preamble().render().unwrap();

        let yaml = rendered.trim_start_matches("---\n").trim_end_matches("---\n");
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(value["title"].as_str(), Some("He said \"hi\": # not a comment"));
        assert_eq!(value["nimbus-id"].as_str(), Some("q"));
    }
}
