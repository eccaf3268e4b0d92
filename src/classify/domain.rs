//! Endpoint URL normalization and registrable-domain extraction
//!
//! Source URLs arrive in many shapes: bare hosts, hosts with paths, URLs with
//! ports, and rule strings with a URL buried inside. The resolver pulls out the
//! first `scheme://host` it can find, rejects IPv4 literals, and maps the host
//! to its registrable domain using the public suffix list.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static HOST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(https?://)?([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})").expect("Invalid regex pattern")
});

static IPV4_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}$").expect("Invalid regex pattern"));

/// A URL reduced to `scheme://host` plus its registrable domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    /// `scheme://host`, `https://` when the input had no scheme
    pub normalized_url: String,

    /// Registrable domain, or the bare host when the suffix list has no match
    pub domain: String,
}

/// Resolve a raw URL without caching
///
/// Returns `None` when no hostname can be found or the authority is an IPv4
/// literal.
///
/// # Examples
///
/// ```
/// use sourcesift::classify::domain::resolve;
///
/// let resolved = resolve("www.example.co.uk/path?q=1").unwrap();
/// assert_eq!(resolved.normalized_url, "https://www.example.co.uk");
/// assert_eq!(resolved.domain, "example.co.uk");
///
/// assert!(resolve("http://1.2.3.4/x").is_none());
/// ```
pub fn resolve(raw_url: &str) -> Option<ResolvedUrl> {
    let raw = raw_url.trim();

    if IPV4_REGEX.is_match(authority_host(raw)) {
        return None;
    }

    let caps = HOST_REGEX.captures(raw)?;
    let scheme = caps.get(1).map_or("https://", |m| m.as_str());
    let host = caps.get(2)?.as_str().to_ascii_lowercase();

    let domain = psl::domain_str(&host)
        .filter(|d| !d.is_empty())
        .map_or_else(|| host.clone(), str::to_string);

    Some(ResolvedUrl {
        normalized_url: format!("{scheme}{host}"),
        domain,
    })
}

/// Host of the authority part of a URL: the text between an optional scheme
/// and the first path, query or fragment delimiter, without user info or port
fn authority_host(raw: &str) -> &str {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    host.split_once(':').map_or(host, |(host, _)| host)
}

/// Per-run memo of resolved URLs, keyed by the raw input string
///
/// The same raw URL often appears in several imported files. The cache lives
/// as long as the run that owns it and is never evicted.
#[derive(Debug, Default)]
pub struct DomainCache {
    entries: HashMap<String, Option<ResolvedUrl>>,
    hits: usize,
}

impl DomainCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve through the cache
    pub fn resolve(&mut self, raw_url: &str) -> Option<ResolvedUrl> {
        if let Some(cached) = self.entries.get(raw_url) {
            self.hits += 1;
            return cached.clone();
        }

        let resolved = resolve(raw_url);
        self.entries.insert(raw_url.to_string(), resolved.clone());
        resolved
    }

    /// Number of distinct raw URLs seen
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups answered from the cache
    pub fn hits(&self) -> usize {
        self.hits
    }
}
