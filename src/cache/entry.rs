//! Cache entry metadata and the on-disk index format
//!
//! The index file is a JSON object keyed by url hash. Timestamps use the
//! tagged form `{"__datetime__": "2016-01-07T10:00:00.123456Z"}`. A record
//! is either a bare timestamp (legacy, no validator) or
//! `{"accessTime": <timestamp>, "ETag": "..."}`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Key written at the top level of the index file
pub const INDEX_VERSION_KEY: &str = "version";

/// Index format version
pub const INDEX_VERSION: &str = "1.0";

/// Metadata for one cached URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// When the URL was last fetched or revalidated
    pub access_time: DateTime<Utc>,

    /// Validator returned by the server, if any
    pub etag: Option<String>,
}

impl CacheEntry {
    pub fn new(access_time: DateTime<Utc>, etag: Option<String>) -> Self {
        Self { access_time, etag }
    }

    /// Age of the entry relative to now
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.access_time
    }

    /// Checks if the entry is older than `ttl`
    pub fn is_stale(&self, ttl: chrono::Duration) -> bool {
        self.age() > ttl
    }
}

/// Computes the cache key for a URL (hex SHA-256)
///
/// # Example
///
/// ```
/// use scheme_scrape::cache::cache_key;
///
/// let key = cache_key("https://example.com/");
/// assert_eq!(key.len(), 64);
/// assert_eq!(key, cache_key("https://example.com/"));
/// ```
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Serialize, Deserialize)]
struct TaggedDateTime {
    #[serde(rename = "__datetime__")]
    value: String,
}

impl TaggedDateTime {
    fn encode(time: &DateTime<Utc>) -> Self {
        Self {
            value: format!("{}Z", time.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f")),
        }
    }

    fn decode(&self) -> Option<DateTime<Utc>> {
        if let Ok(time) = DateTime::parse_from_rfc3339(&self.value) {
            return Some(time.with_timezone(&Utc));
        }
        let naive = self.value.trim_end_matches('Z');
        NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .map(|n| n.and_utc())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RecordRepr {
    Full {
        #[serde(rename = "accessTime")]
        access_time: TaggedDateTime,
        #[serde(rename = "ETag", default)]
        etag: Option<String>,
    },
    Bare(TaggedDateTime),
}

impl RecordRepr {
    fn from_entry(entry: &CacheEntry) -> Self {
        let access_time = TaggedDateTime::encode(&entry.access_time);
        match &entry.etag {
            Some(etag) => RecordRepr::Full {
                access_time,
                etag: Some(etag.clone()),
            },
            None => RecordRepr::Bare(access_time),
        }
    }

    fn into_entry(self) -> Option<CacheEntry> {
        match self {
            RecordRepr::Full { access_time, etag } => access_time
                .decode()
                .map(|time| CacheEntry::new(time, etag)),
            RecordRepr::Bare(access_time) => access_time.decode().map(|time| CacheEntry::new(time, None)),
        }
    }
}

/// Parses index file content
///
/// Records that cannot be understood are skipped with a warning; only a
/// document that is not a JSON object at all is an error.
pub fn decode_index(text: &str) -> Result<HashMap<String, CacheEntry>, serde_json::Error> {
    let raw: Map<String, Value> = serde_json::from_str(text)?;
    let mut entries = HashMap::with_capacity(raw.len());

    for (key, value) in raw {
        if key == INDEX_VERSION_KEY {
            continue;
        }
        let entry = serde_json::from_value::<RecordRepr>(value)
            .ok()
            .and_then(RecordRepr::into_entry);
        match entry {
            Some(entry) => {
                entries.insert(key, entry);
            }
            None => tracing::warn!("Skipping unreadable cache index record {}", key),
        }
    }

    Ok(entries)
}

/// Serializes index entries, sorted by key
pub fn encode_index(entries: &HashMap<String, CacheEntry>) -> Result<String, serde_json::Error> {
    let mut raw = Map::new();
    raw.insert(
        INDEX_VERSION_KEY.to_string(),
        Value::String(INDEX_VERSION.to_string()),
    );
    for (key, entry) in entries {
        raw.insert(key.clone(), serde_json::to_value(RecordRepr::from_entry(entry))?);
    }
    serde_json::to_string(&raw)
}
