//! Name filter: substring or wildcard match over display names.
//!
//! Filtered-out items stay in the store; the filter only decides what reaches the display.

use regex::{Regex, RegexBuilder};

/// Returns true if `name` passes `filter_text`.
///
/// Empty text always matches. Text containing `*` or `?` is a wildcard pattern over the
/// whole name; anything else is substring containment.
pub fn matches(name: &str, filter_text: &str, case_sensitive: bool) -> bool {
    if filter_text.is_empty() {
        return true;
    }
    match compile_wildcard(filter_text, case_sensitive) {
        Some(pattern) => pattern.is_match(name),
        None => contains(name, filter_text, case_sensitive),
    }
}

fn contains(name: &str, filter_text: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        name.contains(filter_text)
    } else {
        name.to_lowercase().contains(&filter_text.to_lowercase())
    }
}

fn is_wildcard(text: &str) -> bool {
    text.contains(['*', '?'])
}

/// Compiles a wildcard pattern, or returns `None` for plain text.
fn compile_wildcard(text: &str, case_sensitive: bool) -> Option<Regex> {
    if !is_wildcard(text) {
        return None;
    }

    let mut pattern = String::with_capacity(text.len() + 8);
    pattern.push('^');
    for c in text.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');

    match RegexBuilder::new(&pattern).case_insensitive(!case_sensitive).build() {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Filter: couldn't compile wildcard {:?}, using substring match: {}", text, e);
            None
        }
    }
}

/// The active filter of a folder, with its wildcard pattern compiled once.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    text: String,
    case_sensitive: bool,
    applied: bool,
    pattern: Option<Regex>,
}

impl ItemFilter {
    pub fn new(text: impl Into<String>, case_sensitive: bool, applied: bool) -> Self {
        let text = text.into();
        let pattern = compile_wildcard(&text, case_sensitive);
        Self {
            text,
            case_sensitive,
            applied,
            pattern,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn applied(&self) -> bool {
        self.applied
    }

    /// An applied filter with empty text hides nothing.
    pub fn is_active(&self) -> bool {
        self.applied && !self.text.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        if !self.is_active() {
            return true;
        }
        match &self.pattern {
            Some(pattern) => pattern.is_match(name),
            None => contains(name, &self.text, self.case_sensitive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_matches_everything() {
        assert!(matches("anything", "", true));
        assert!(ItemFilter::new("", false, true).matches("x"));
        assert!(!ItemFilter::new("", false, true).is_active());
    }

    #[test]
    fn substring_respects_case_setting() {
        assert!(matches("Report.PDF", "pdf", false));
        assert!(!matches("Report.PDF", "pdf", true));
        assert!(matches("Report.PDF", "PDF", true));
    }

    #[test]
    fn wildcards_match_whole_name() {
        assert!(matches("notes.txt", "*.txt", false));
        assert!(!matches("notes.txt.bak", "*.txt", false));
        assert!(matches("img_1.png", "img_?.png", false));
        assert!(!matches("img_10.png", "img_?.png", false));
        assert!(matches("A.TXT", "*.txt", false));
        assert!(!matches("A.TXT", "*.txt", true));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(matches("a+b (1).txt", "a+b (?)*", true));
        assert!(!matches("aab 1.txt", "a+b*", true));
    }

    #[test]
    fn unapplied_filter_hides_nothing() {
        let filter = ItemFilter::new("zzz", false, false);
        assert!(filter.matches("abc"));
        assert!(!filter.is_active());
    }
}
