// Core data structures for sourcesift

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// One source descriptor: a remote content endpoint plus metadata and
/// scraping rules.
///
/// Only the fields the pipeline reads or writes are modelled; everything else
/// (rules, login data, weights, ...) lives in `extra` and is written back
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Endpoint URL, replaced by `scheme://host` once resolved
    #[serde(rename = "bookSourceUrl")]
    pub url: String,

    /// Display name
    #[serde(rename = "bookSourceName")]
    pub name: String,

    /// Category labels, stored on the wire as one comma-joined string
    #[serde(
        rename = "bookSourceGroup",
        default,
        serialize_with = "serialize_tags",
        deserialize_with = "deserialize_tags",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,

    /// Numeric source type (novel, audio, comic, ...)
    #[serde(rename = "bookSourceType", default)]
    pub type_id: i64,

    /// Free-form comment, only read as classification text
    #[serde(
        rename = "bookSourceComment",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub comment: String,

    /// Probe latency in milliseconds
    #[serde(
        rename = "respondTime",
        default,
        deserialize_with = "deserialize_respond_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub respond_time: Option<u64>,

    /// Registrable domain; empty when the URL could not be resolved
    #[serde(skip)]
    pub domain: String,

    /// First matched category, when primary categories are stored
    #[serde(skip)]
    pub primary_category: Option<String>,

    /// Every other field, passed through opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SourceRecord {
    /// Create a record with the given URL and name
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the type id
    pub fn with_type(mut self, type_id: i64) -> Self {
        self.type_id = type_id;
        self
    }

    /// Set the raw group tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Whether the record resolved to a network domain
    pub fn has_domain(&self) -> bool {
        !self.domain.is_empty()
    }

    /// Tags joined the way they are stored on the wire
    pub fn group(&self) -> String {
        self.tags.join(",")
    }

    /// Latency used for ordering; unmeasured records count as the slowest
    pub fn respond_time_or_max(&self) -> u64 {
        self.respond_time.unwrap_or(u64::MAX)
    }

    /// Last-resort ordering over the serialized record, for records that
    /// agree on every field the pipeline looks at
    pub fn content_order(&self, other: &Self) -> Ordering {
        let wire = |record: &Self| serde_json::to_string(record).unwrap_or_default();
        wire(self).cmp(&wire(other))
    }

    /// Output ordering: lower-cased name, then latency
    pub fn display_order(&self, other: &Self) -> Ordering {
        self.name
            .to_lowercase()
            .cmp(&other.name.to_lowercase())
            .then_with(|| self.respond_time_or_max().cmp(&other.respond_time_or_max()))
    }
}

/// Sort records for output: display order, then domain, URL and finally
/// the full wire form so the result is independent of arrival order
pub fn sort_for_output(records: &mut [SourceRecord]) {
    records.sort_by(|a, b| {
        a.display_order(b)
            .then_with(|| a.domain.cmp(&b.domain))
            .then_with(|| a.url.cmp(&b.url))
            .then_with(|| a.content_order(b))
    });
}

fn serialize_tags<S>(tags: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&tags.join(","))
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .split(',')
        .filter(|tag| !tag.trim().is_empty())
        .map(str::to_string)
        .collect())
}

fn deserialize_respond_time<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    // Older exports store the latency as a string, sometimes an empty one.
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

/// Terminal partitions a record can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// URL did not resolve to a domain
    NoDomain,
    /// Probe failed or the page did not look like content
    Unreachable,
    /// Shares a domain with a faster record
    Duplicate,
    /// Kept record for its domain
    Unique,
}

impl Bucket {
    /// File stem used when the bucket is written out
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDomain => "no-domain",
            Self::Unreachable => "unreachable",
            Self::Duplicate => "duplicates",
            Self::Unique => "unique",
        }
    }

    /// All buckets in output order
    pub fn all() -> [Self; 4] {
        [Self::NoDomain, Self::Unreachable, Self::Duplicate, Self::Unique]
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record counts per bucket at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounts {
    pub no_domain: usize,
    pub unreachable: usize,
    pub duplicates: usize,
    pub unique: usize,
}

impl BucketCounts {
    pub fn get(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::NoDomain => self.no_domain,
            Bucket::Unreachable => self.unreachable,
            Bucket::Duplicate => self.duplicates,
            Bucket::Unique => self.unique,
        }
    }

    pub fn total(&self) -> usize {
        self.no_domain + self.unreachable + self.duplicates + self.unique
    }
}

impl fmt::Display for BucketCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unique {}, duplicates {}, unreachable {}, no-domain {}",
            self.unique, self.duplicates, self.unreachable, self.no_domain
        )
    }
}
