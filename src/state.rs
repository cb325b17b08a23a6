//! Crawl state persisted between runs: the URL record collection and the
//! hand-curated override map, both stored as JSON objects keyed by URL.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// URL → recorded metadata, as written by a crawl.
pub type SiteUrls = HashMap<String, UrlRecord>;

/// URL → relative mirror path, bypassing automatic path inference.
pub type OverrideMap = HashMap<String, String>;

/// What a crawl learned about one URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    #[serde(rename = "content-type", default)]
    pub content_type: Option<String>,

    /// Accepts either a JSON number or the raw header string.
    #[serde(
        rename = "content-length",
        default,
        deserialize_with = "deserialize_length",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_length: Option<u64>,

    /// Any other keys the crawl stored, kept as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl UrlRecord {
    pub fn new(content_type: Option<&str>, content_length: Option<u64>) -> Self {
        Self {
            content_type: content_type.map(str::to_string),
            content_length,
            extra: serde_json::Map::new(),
        }
    }
}

fn deserialize_length<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid content-length {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid content-length {:?}", s))),
        other => Err(de::Error::custom(format!("invalid content-length {}", other))),
    }
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Writes `value` as two-space indented JSON followed by a newline.
/// With `sort_keys` every object is emitted in key order.
pub fn write_json_file<T: Serialize>(value: &T, path: &Path, sort_keys: bool) -> Result<()> {
    let mut text = if sort_keys {
        // serde_json::Map is ordered by key unless preserve_order is enabled
        serde_json::to_string_pretty(&serde_json::to_value(value)?)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    text.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}
