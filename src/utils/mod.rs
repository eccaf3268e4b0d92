//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Make a label safe to use as a file or directory name
///
/// Path separators and characters Windows rejects become `_`; a result that
/// is empty or consists only of dots becomes `_`.
pub fn sanitize_filename(filename: &str) -> String {
    static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();

    let re = INVALID_CHARS
        .get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("Invalid regex pattern"));

    let sanitized = re.replace_all(filename.trim(), "_").to_string();
    if sanitized.chars().all(|c| c == '.') {
        return String::from("_");
    }
    sanitized
}

/// Whole milliseconds in a duration, saturating at `u64::MAX`
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Format a duration as seconds with two decimals
pub fn format_elapsed(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// Format byte size as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return String::from("0 B");
    }

    let base: f64 = 1024.0;
    let exponent = (bytes as f64).log(base).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = bytes as f64 / base.powi(exponent as i32);

    format!("{value:.2} {}", UNITS[exponent])
}
