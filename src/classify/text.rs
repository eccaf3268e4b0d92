//! Display-name cleanup
//!
//! Names in imported source files are decorated with emoji, brackets and
//! punctuation. Only ASCII alphanumerics and CJK unified ideographs are kept.

use crate::utils::normalize_whitespace;

/// Strip a display name down to alphanumeric and CJK tokens
///
/// Every other character becomes a space, then whitespace runs collapse to a
/// single space and the ends are trimmed.
///
/// # Examples
///
/// ```
/// use sourcesift::classify::text::clean_name;
///
/// assert_eq!(clean_name("🔥【精品】小说-网 v2"), "精品 小说 网 v2");
/// ```
pub fn clean_name(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if is_kept(c) { c } else { ' ' })
        .collect();

    normalize_whitespace(&replaced)
}

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fff}').contains(&c)
}
