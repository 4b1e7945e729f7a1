//! Case-insensitive search over a log panel's text.
//!
//! Matching happens on a lowercased copy of the text. Lowercasing can change
//! byte lengths (`'İ'` folds to two code points), so match spans are mapped
//! back to the original through a per-character offset table. Pure-ASCII
//! text skips the table because offsets are identical.

use memchr::memchr_iter;

/// One occurrence of the query in the folded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Byte offset in the folded text.
    pub start: usize,
    pub end: usize,
    /// 0-based line of the match start.
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    Match,
    CurrentMatch,
}

/// A styled slice of the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

/// Lowercased text plus what it takes to map offsets back.
struct Folded {
    text: String,
    /// `(folded_start, original_start)` per original char; `None` for ASCII.
    offsets: Option<Vec<(usize, usize)>>,
}

impl Folded {
    fn new(original: &str) -> Self {
        if original.is_ascii() {
            return Self {
                text: original.to_ascii_lowercase(),
                offsets: None,
            };
        }
        let mut text = String::with_capacity(original.len());
        let mut offsets = Vec::with_capacity(original.len());
        for (orig_start, ch) in original.char_indices() {
            offsets.push((text.len(), orig_start));
            text.extend(ch.to_lowercase());
        }
        Self {
            text,
            offsets: Some(offsets),
        }
    }

    /// Original offset of the char whose folded form contains `pos`.
    fn start_to_original(&self, pos: usize) -> usize {
        match &self.offsets {
            None => pos,
            Some(offsets) => {
                let i = offsets.partition_point(|&(folded, _)| folded <= pos);
                offsets.get(i.saturating_sub(1)).map_or(0, |&(_, orig)| orig)
            }
        }
    }

    /// Original offset just past the char whose folded form ends at or
    /// after `pos`.
    fn end_to_original(&self, pos: usize, original_len: usize) -> usize {
        match &self.offsets {
            None => pos,
            Some(offsets) => {
                let i = offsets.partition_point(|&(folded, _)| folded < pos);
                offsets.get(i).map_or(original_len, |&(_, orig)| orig)
            }
        }
    }
}

fn scan(folded: &str, query: &str) -> Vec<Match> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let bytes = folded.as_bytes();
    let mut newlines = memchr_iter(b'\n', bytes).peekable();
    let mut line = 0;
    folded
        .match_indices(&needle)
        .map(|(start, m)| {
            while newlines.next_if(|&nl| nl < start).is_some() {
                line += 1;
            }
            Match {
                start,
                end: start + m.len(),
                line,
            }
        })
        .collect()
}

/// Every non-overlapping, case-insensitive occurrence of `query` in `text`,
/// left to right. An empty query matches nothing.
#[must_use]
pub fn find_matches(text: &str, query: &str) -> Vec<Match> {
    if query.is_empty() {
        return Vec::new();
    }
    scan(&Folded::new(text).text, query)
}

/// Split `text` into plain and highlighted spans for `query`.
///
/// The match at index `current` is styled [`SpanStyle::CurrentMatch`].
#[must_use]
pub fn highlight(text: &str, query: &str, current: Option<usize>) -> Vec<Span> {
    let mut spans = Vec::new();
    if query.is_empty() {
        if !text.is_empty() {
            spans.push(Span {
                text: text.to_string(),
                style: SpanStyle::Plain,
            });
        }
        return spans;
    }

    let folded = Folded::new(text);
    let mut cursor = 0;
    for (index, m) in scan(&folded.text, query).into_iter().enumerate() {
        let start = folded.start_to_original(m.start).max(cursor);
        let end = folded.end_to_original(m.end, text.len()).max(start);
        if start > cursor {
            spans.push(Span {
                text: text[cursor..start].to_string(),
                style: SpanStyle::Plain,
            });
        }
        spans.push(Span {
            text: text[start..end].to_string(),
            style: if current == Some(index) {
                SpanStyle::CurrentMatch
            } else {
                SpanStyle::Match
            },
        });
        cursor = end;
    }
    if cursor < text.len() {
        spans.push(Span {
            text: text[cursor..].to_string(),
            style: SpanStyle::Plain,
        });
    }
    spans
}

/// Viewer-side search state for the log panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    query: String,
    matches: Vec<Match>,
    current: Option<usize>,
}

impl SearchState {
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    #[must_use]
    pub const fn current(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// Start a new search and select the first match.
    pub fn set_query(&mut self, query: impl Into<String>, text: &str) {
        self.query = query.into();
        self.matches = find_matches(text, &self.query);
        self.current = if self.matches.is_empty() { None } else { Some(0) };
    }

    /// Re-run the query against changed text, keeping the selection when
    /// it is still in range.
    pub fn refresh(&mut self, text: &str) {
        self.matches = find_matches(text, &self.query);
        self.current = match (self.current, self.matches.len()) {
            (_, 0) => None,
            (Some(i), n) => Some(i.min(n - 1)),
            (None, _) => Some(0),
        };
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Select match `index`, wrapping in both directions.
    ///
    /// Returns the `"k/n"` position label, or `None` without matches.
    pub fn jump_to(&mut self, index: isize) -> Option<String> {
        let n = isize::try_from(self.matches.len()).ok().filter(|&n| n > 0)?;
        let wrapped = usize::try_from(index.rem_euclid(n)).ok()?;
        self.current = Some(wrapped);
        self.position()
    }

    pub fn next(&mut self) -> Option<String> {
        let i = self.current_isize();
        self.jump_to(i + 1)
    }

    pub fn prev(&mut self) -> Option<String> {
        let i = self.current_isize();
        self.jump_to(i - 1)
    }

    /// `"k/n"` label for the current match.
    #[must_use]
    pub fn position(&self) -> Option<String> {
        let current = self.current?;
        Some(format!("{}/{}", current + 1, self.matches.len()))
    }

    /// Line of the current match, for scrolling.
    #[must_use]
    pub fn current_line(&self) -> Option<usize> {
        self.current
            .and_then(|i| self.matches.get(i))
            .map(|m| m.line)
    }

    fn current_isize(&self) -> isize {
        self.current
            .and_then(|i| isize::try_from(i).ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(spans: &[Span]) -> String {
        spans
            .iter()
            .map(|s| match s.style {
                SpanStyle::Plain => s.text.clone(),
                SpanStyle::Match => format!("[{}]", s.text),
                SpanStyle::CurrentMatch => format!("<{}>", s.text),
            })
            .collect()
    }

    #[test]
    fn finds_case_insensitive_occurrences() {
        let matches = find_matches("abcABCabc", "abc");
        let starts: Vec<usize> = matches.iter().map(|m| m.start).collect();
        assert_eq!(starts, vec![0, 3, 6]);
        assert!(matches.iter().all(|m| m.line == 0));
    }

    #[test]
    fn matches_do_not_overlap() {
        assert_eq!(find_matches("aaaa", "aa").len(), 2);
    }

    #[test]
    fn empty_query_matches_nothing() {
        assert!(find_matches("abc", "").is_empty());
        assert_eq!(rendered(&highlight("abc", "", Some(0))), "abc");
    }

    #[test]
    fn reports_line_numbers() {
        let text = "=== RUN TestA\nok\n--- FAIL: TestA\nFAIL\n";
        let lines: Vec<usize> = find_matches(text, "fail").iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn highlight_marks_current_match() {
        let spans = highlight("abcABCabc", "abc", Some(1));
        assert_eq!(rendered(&spans), "[abc]<ABC>[abc]");
        let spans = highlight("x Error y error", "ERROR", None);
        assert_eq!(rendered(&spans), "x [Error] y [error]");
    }

    #[test]
    fn highlight_maps_length_changing_folds() {
        // 'İ' lowercases to "i\u{307}", one byte longer than the original.
        let text = "İstanbul ok STANBUL";
        let spans = highlight(text, "stanbul", Some(0));
        assert_eq!(rendered(&spans), "İ<stanbul> ok [STANBUL]");

        // A match that starts inside a char's folded expansion covers the
        // whole original char.
        let spans = highlight("xİy", "i", None);
        assert_eq!(rendered(&spans), "x[İ]y");
    }

    #[test]
    fn jump_wraps_both_directions() {
        let mut search = SearchState::default();
        search.set_query("abc", "abcABCabc");
        assert_eq!(search.current(), Some(0));
        assert_eq!(search.position().as_deref(), Some("1/3"));

        assert_eq!(search.jump_to(-1).as_deref(), Some("3/3"));
        assert_eq!(search.current(), Some(2));
        assert_eq!(search.jump_to(3).as_deref(), Some("1/3"));
        assert_eq!(search.current(), Some(0));

        assert_eq!(search.prev().as_deref(), Some("3/3"));
        assert_eq!(search.next().as_deref(), Some("1/3"));
    }

    #[test]
    fn jump_without_matches_is_none() {
        let mut search = SearchState::default();
        search.set_query("zzz", "abc");
        assert!(search.is_active());
        assert_eq!(search.jump_to(0), None);
        assert_eq!(search.current(), None);
        assert_eq!(search.current_line(), None);
    }

    #[test]
    fn refresh_keeps_selection_in_range() {
        let mut search = SearchState::default();
        search.set_query("ok", "ok\nok\nok\n");
        search.jump_to(2);
        assert_eq!(search.current_line(), Some(2));
        search.refresh("ok\n");
        assert_eq!(search.current(), Some(0));
        search.refresh("ok\nok\nok\nok\n");
        assert_eq!(search.current(), Some(0));
        search.clear();
        assert!(!search.is_active());
    }
}
