//! Record tagging and URL resolution
//!
//! The classification engine turns the raw text fields of a record into an
//! ordered tag list and resolves its endpoint URL to a registrable domain.
//! Records whose URL does not resolve end up with an empty `domain`, which is
//! what routes them away from probing.

pub mod domain;
pub mod text;

use regex::{Regex, RegexBuilder};

use crate::config::ClassifyConfig;
use crate::error::{Error, Result};
use crate::models::SourceRecord;

pub use domain::{DomainCache, ResolvedUrl};
pub use text::clean_name;

/// Case-insensitive "any of these keywords" matcher for one category label
#[derive(Debug, Clone)]
pub struct CategoryMatcher {
    label: String,
    pattern: Regex,
}

impl CategoryMatcher {
    /// Compile a matcher; `None` when the keyword list is empty
    pub fn new(label: &str, keywords: &[String]) -> Result<Option<Self>> {
        let alternatives: Vec<String> = keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(k))
            .collect();

        if alternatives.is_empty() {
            return Ok(None);
        }

        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::config(format!("category '{label}': {e}")))?;

        Ok(Some(Self {
            label: label.to_string(),
            pattern,
        }))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Records split by whether their URL resolved
#[derive(Debug, Default)]
pub struct ClassifiedBatch {
    /// Records with a domain, eligible for probing
    pub resolved: Vec<SourceRecord>,

    /// Records whose URL did not resolve
    pub no_domain: Vec<SourceRecord>,
}

/// Tags records from their group, name and comment text
///
/// Matchers are compiled once and evaluated in the configured rule order.
#[derive(Debug, Clone)]
pub struct ClassificationEngine {
    matchers: Vec<CategoryMatcher>,
    config: ClassifyConfig,
}

impl ClassificationEngine {
    /// Compile the category rules
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a keyword set does not compile
    pub fn new(config: &ClassifyConfig) -> Result<Self> {
        let mut matchers = Vec::with_capacity(config.categories.len());
        for rule in &config.categories {
            if let Some(matcher) = CategoryMatcher::new(&rule.label, &rule.keywords)? {
                matchers.push(matcher);
            }
        }

        Ok(Self {
            matchers,
            config: config.clone(),
        })
    }

    /// Number of compiled matchers
    pub fn matcher_count(&self) -> usize {
        self.matchers.len()
    }

    /// Clean, tag and resolve one record
    pub fn classify(&self, mut record: SourceRecord, cache: &mut DomainCache) -> SourceRecord {
        record.name = clean_name(&record.name);

        let text = self.classification_text(&record);
        let mut tags: Vec<String> = Vec::new();
        for matcher in &self.matchers {
            if matcher.is_match(&text) && !tags.iter().any(|t| t == matcher.label()) {
                tags.push(matcher.label().to_string());
            }
        }

        if self.config.store_primary_category {
            if let Some(first) = tags.first() {
                record.primary_category = Some(first.clone());
            }
        }

        if self.config.always_tag_default_type || record.type_id != 0 {
            if let Some(type_label) = self.config.type_label(record.type_id) {
                tags.retain(|t| t != type_label);
                tags.insert(0, type_label.to_string());
            }
        }

        record.tags = tags;

        if let Some(resolved) = cache.resolve(&record.url) {
            record.url = resolved.normalized_url;
            record.domain = resolved.domain;
        }

        record
    }

    /// Classify a whole batch and split it by URL resolution
    pub fn classify_batch(
        &self,
        records: Vec<SourceRecord>,
        cache: &mut DomainCache,
    ) -> ClassifiedBatch {
        let mut batch = ClassifiedBatch::default();

        for record in records {
            let record = self.classify(record, cache);
            if record.has_domain() {
                batch.resolved.push(record);
            } else {
                tracing::trace!(url = %record.url, name = %record.name, "URL did not resolve");
                batch.no_domain.push(record);
            }
        }

        batch
    }

    fn classification_text(&self, record: &SourceRecord) -> String {
        let mut parts = vec![record.group()];

        if self.config.classify_from_name {
            parts.push(record.name.clone());
        }

        if self.config.classify_from_comment {
            parts.push(record.comment.clone());
        }

        parts.join(" ")
    }
}
