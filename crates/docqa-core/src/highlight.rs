//! Query match highlighting.
//!
//! [`Highlighter::highlight`] wraps every fragment of a chunk that matches
//! the query in a marker (Markdown bold, `**`, by default). What counts as
//! a match is decided by a [`Matcher`]:
//!
//! - [`TermMatcher`]: any significant query word, case-insensitive.
//! - [`PhraseMatcher`]: the whole query as one literal, case-insensitive.
//!
//! Highlighting is pure. Text that is already enclosed in a marker pair is
//! passed through untouched, so running the highlighter twice with the
//! same query gives the same output as running it once.

use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// Default marker placed on both sides of a match.
pub const DEFAULT_MARKER: &str = "**";

/// Finds the spans of `text` that should be marked.
///
/// Returned ranges are byte offsets into `text`, sorted and
/// non-overlapping.
pub trait Matcher: Send + Sync {
    fn find(&self, text: &str) -> Vec<Range<usize>>;
}

/// Matches the query as a single case-insensitive literal.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    pattern: Regex,
}

impl PhraseMatcher {
    /// Returns `None` when the trimmed query is empty.
    pub fn new(query: &str) -> Option<Self> {
        let phrase = query.trim();
        if phrase.is_empty() {
            return None;
        }
        RegexBuilder::new(&regex::escape(phrase))
            .case_insensitive(true)
            .build()
            .ok()
            .map(|pattern| Self { pattern })
    }
}

impl Matcher for PhraseMatcher {
    fn find(&self, text: &str) -> Vec<Range<usize>> {
        self.pattern.find_iter(text).map(|m| m.range()).collect()
    }
}

/// Matches any significant query term, case-insensitive.
///
/// Terms are whitespace-separated query words with surrounding
/// punctuation removed. Words shorter than `min_term_chars` are dropped
/// unless nothing else is left. Longer terms win where two could match at
/// the same position.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    pattern: Regex,
    terms: Vec<String>,
}

impl TermMatcher {
    /// Returns `None` when the query has no usable terms.
    pub fn new(query: &str, min_term_chars: usize) -> Option<Self> {
        let words: Vec<String> = query
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let significant: Vec<String> = words
            .iter()
            .filter(|w| w.chars().count() >= min_term_chars)
            .cloned()
            .collect();
        let mut terms = if significant.is_empty() { words } else { significant };
        if terms.is_empty() {
            return None;
        }

        terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
        terms.dedup();

        let alternation = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        RegexBuilder::new(&format!("(?:{alternation})"))
            .case_insensitive(true)
            .build()
            .ok()
            .map(|pattern| Self { pattern, terms })
    }

    /// Lowercased terms in match priority order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

impl Matcher for TermMatcher {
    fn find(&self, text: &str) -> Vec<Range<usize>> {
        self.pattern.find_iter(text).map(|m| m.range()).collect()
    }
}

/// Which [`Matcher`] a [`Highlighter`] builds for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    #[default]
    Terms,
    Phrase,
}

/// Wraps query matches in a marker.
#[derive(Debug, Clone)]
pub struct Highlighter {
    marker: String,
    kind: MatcherKind,
    min_term_chars: usize,
}

impl Highlighter {
    pub fn new(marker: impl Into<String>, kind: MatcherKind, min_term_chars: usize) -> Self {
        Self {
            marker: marker.into(),
            kind,
            min_term_chars,
        }
    }

    /// Build the configured matcher for `query`, if the query has anything to match.
    pub fn matcher_for(&self, query: &str) -> Option<Box<dyn Matcher>> {
        match self.kind {
            MatcherKind::Terms => TermMatcher::new(query, self.min_term_chars)
                .map(|m| Box::new(m) as Box<dyn Matcher>),
            MatcherKind::Phrase => {
                PhraseMatcher::new(query).map(|m| Box::new(m) as Box<dyn Matcher>)
            }
        }
    }

    /// Mark every match of `query` in `text` using the configured matcher.
    pub fn highlight(&self, text: &str, query: &str) -> String {
        match self.matcher_for(query) {
            Some(matcher) => self.highlight_with(text, matcher.as_ref()),
            None => text.to_string(),
        }
    }

    /// Mark every span `matcher` finds in the unmarked parts of `text`.
    pub fn highlight_with(&self, text: &str, matcher: &dyn Matcher) -> String {
        if self.marker.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len() + 16);
        let mut cursor = 0;
        for marked in marked_spans(text, &self.marker) {
            self.mark_segment(&text[cursor..marked.start], matcher, &mut out);
            out.push_str(&text[marked.clone()]);
            cursor = marked.end;
        }
        self.mark_segment(&text[cursor..], matcher, &mut out);
        out
    }

    fn mark_segment(&self, segment: &str, matcher: &dyn Matcher, out: &mut String) {
        let mut cursor = 0;
        for range in matcher.find(segment) {
            if range.start < cursor || range.is_empty() {
                continue;
            }
            out.push_str(&segment[cursor..range.start]);
            out.push_str(&self.marker);
            out.push_str(&segment[range.clone()]);
            out.push_str(&self.marker);
            cursor = range.end;
        }
        out.push_str(&segment[cursor..]);
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, MatcherKind::default(), 3)
    }
}

/// Byte ranges of `marker…marker` pairs, markers included.
///
/// Markers pair up left to right; an unpaired trailing marker is treated
/// as plain text.
fn marked_spans(text: &str, marker: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut search_from = 0;
    while let Some(open) = text[search_from..].find(marker).map(|i| i + search_from) {
        let inner = open + marker.len();
        match text[inner..].find(marker).map(|i| i + inner) {
            Some(close) => {
                let end = close + marker.len();
                spans.push(open..end);
                search_from = end;
            }
            None => break,
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> Highlighter {
        Highlighter::default()
    }

    fn phrase() -> Highlighter {
        Highlighter::new("**", MatcherKind::Phrase, 3)
    }

    #[test]
    fn test_marks_each_term_case_insensitively() {
        let out = terms().highlight("Check the Battery and the battery cables.", "battery cables");
        assert_eq!(out, "Check the **Battery** and the **battery** **cables**.");
    }

    #[test]
    fn test_no_match_returns_input() {
        let text = "Nothing relevant here.";
        assert_eq!(terms().highlight(text, "solar"), text);
        assert_eq!(phrase().highlight(text, "solar panel"), text);
    }

    #[test]
    fn test_short_words_ignored_when_longer_terms_exist() {
        let out = terms().highlight("how to fix a pump", "how to fix a pump");
        assert_eq!(out, "**how** to **fix** a **pump**");
    }

    #[test]
    fn test_short_words_used_when_nothing_else() {
        let out = terms().highlight("go to AI lab", "ai");
        assert_eq!(out, "go to **AI** lab");
    }

    #[test]
    fn test_longest_term_wins() {
        let m = TermMatcher::new("bat battery", 3).unwrap();
        assert_eq!(m.terms(), &["battery".to_string(), "bat".to_string()]);
        let out = terms().highlight("battery bat", "bat battery");
        assert_eq!(out, "**battery** **bat**");
    }

    #[test]
    fn test_punctuation_stripped_from_terms() {
        let out = terms().highlight("Where is the water filter?", "water?");
        assert_eq!(out, "Where is the **water** filter?");
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let out = phrase().highlight("cost is $5.00 (approx)", "$5.00 (approx)");
        assert_eq!(out, "cost is **$5.00 (approx)**");
        let out = phrase().highlight("cost is $5x00", "$5.00");
        assert_eq!(out, "cost is $5x00");
    }

    #[test]
    fn test_phrase_matcher_marks_whole_phrase_only() {
        let out = phrase().highlight("water filter, water, filter", "Water Filter");
        assert_eq!(out, "**water filter**, water, filter");
    }

    #[test]
    fn test_unicode_case_folding() {
        let out = terms().highlight("Über alles, über", "über");
        assert_eq!(out, "**Über** alles, **über**");
    }

    #[test]
    fn test_highlight_is_idempotent() {
        let h = terms();
        let text = "Seed storage: keep seeds dry. Storage temperature matters.";
        let once = h.highlight(text, "seed storage");
        let twice = h.highlight(&once, "seed storage");
        assert_eq!(once, twice);

        let p = phrase();
        let once = p.highlight(text, "seed storage");
        assert_eq!(p.highlight(&once, "seed storage"), once);
    }

    #[test]
    fn test_already_marked_spans_untouched() {
        let out = terms().highlight("**water** and water", "water");
        assert_eq!(out, "**water** and **water**");
    }

    #[test]
    fn test_unpaired_marker_is_plain_text() {
        let out = terms().highlight("5 ** water", "water");
        assert_eq!(out, "5 ** **water**");
    }

    #[test]
    fn test_empty_query_leaves_text() {
        assert_eq!(terms().highlight("water", "   "), "water");
        assert_eq!(phrase().highlight("water", ""), "water");
        assert!(TermMatcher::new("?? !!", 3).is_none());
    }

    #[test]
    fn test_custom_marker() {
        let h = Highlighter::new("==", MatcherKind::Terms, 3);
        assert_eq!(h.highlight("rain barrel", "barrel"), "rain ==barrel==");
    }
}
