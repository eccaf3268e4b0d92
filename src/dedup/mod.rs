//! Domain-keyed deduplication
//!
//! Several records often point at the same site under different names. Only
//! the fastest one per registrable domain is kept; the rest are reported as
//! duplicates. The kept record depends only on the records themselves, never
//! on the order they arrive in.

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::models::{sort_for_output, SourceRecord};

/// Result of a deduplication pass
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// One record per domain, sorted for output
    pub unique: Vec<SourceRecord>,

    /// Every displaced or losing record, sorted for output
    pub duplicates: Vec<SourceRecord>,
}

impl DedupOutcome {
    /// Share of input records that were duplicates (0.0 - 1.0)
    pub fn dedup_ratio(&self) -> f64 {
        let total = self.unique.len() + self.duplicates.len();
        if total == 0 {
            return 0.0;
        }
        self.duplicates.len() as f64 / total as f64
    }
}

/// Keep the lowest-latency record for each domain
///
/// Ties on latency fall back to the lower-cased name, the URL and finally the
/// full record. Records without a latency count as the slowest.
///
/// # Examples
///
/// ```
/// use sourcesift::dedup::deduplicate_by_domain;
/// use sourcesift::models::SourceRecord;
///
/// let record = |name: &str, ms: u64| SourceRecord {
///     domain: "example.com".to_string(),
///     respond_time: Some(ms),
///     ..SourceRecord::new("https://example.com", name)
/// };
///
/// let outcome = deduplicate_by_domain(vec![record("slow", 300), record("fast", 40)]);
/// assert_eq!(outcome.unique[0].name, "fast");
/// assert_eq!(outcome.duplicates[0].name, "slow");
/// ```
pub fn deduplicate_by_domain(records: Vec<SourceRecord>) -> DedupOutcome {
    let mut kept: BTreeMap<String, SourceRecord> = BTreeMap::new();
    let mut duplicates = Vec::new();

    for record in records {
        match kept.entry(record.domain.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if preference(&record, slot.get()) == Ordering::Less {
                    let displaced = slot.insert(record);
                    tracing::trace!(domain = %displaced.domain, name = %displaced.name, "Displaced by faster record");
                    duplicates.push(displaced);
                } else {
                    duplicates.push(record);
                }
            }
        }
    }

    let mut unique: Vec<SourceRecord> = kept.into_values().collect();
    sort_for_output(&mut unique);
    sort_for_output(&mut duplicates);

    tracing::debug!(
        unique = unique.len(),
        duplicates = duplicates.len(),
        "Deduplicated by domain"
    );

    DedupOutcome { unique, duplicates }
}

/// Total order deciding which of two same-domain records is kept
fn preference(a: &SourceRecord, b: &SourceRecord) -> Ordering {
    a.respond_time_or_max()
        .cmp(&b.respond_time_or_max())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.url.cmp(&b.url))
        .then_with(|| a.content_order(b))
}
