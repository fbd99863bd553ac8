//! Main content extraction
//!
//! This module extracts the main readable text of a fetched page. It first
//! looks for a single container that usually wraps the article body, in a
//! fixed priority order; when none is present the whole document is used
//! after removing the regions that are almost never content (page chrome,
//! forms, comment threads, sidebars and ads).

use std::collections::HashMap;
use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::processing::TextSanitizer;

/// Maximum characters of extracted content
pub const MAX_CONTENT_CHARS: usize = 8000;

/// Appended to content cut at the character limit
pub const TRUNCATION_MARKER: &str = "... [content truncated]";

/// Extracted content from a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Plain text with paragraph structure
    pub text: String,
    /// Container the text came from, `None` for the whole-page fallback
    pub container: Option<String>,
    /// Whether the text was cut at the character limit
    pub truncated: bool,
}

/// An element type with a balanced open/close scanner
#[derive(Debug, Clone)]
struct TagScanner {
    tags: Regex,
}

impl TagScanner {
    fn new(tag: &str) -> Self {
        Self {
            tags: Regex::new(&format!(r"(?i)<(/?){tag}\b[^>]*>")).expect("valid tag scanner"),
        }
    }

    /// Pair every open tag in `markup` with its own close tag
    ///
    /// One pass with a stack of open tags, so nested elements of the same
    /// name are matched correctly. Keys are the byte offsets where open tags
    /// start; values are the spans of their close tags. Open tags that are
    /// never closed, self-closing tags and stray close tags are absent.
    fn pair_closes(&self, markup: &str) -> HashMap<usize, Range<usize>> {
        let mut open_starts = Vec::new();
        let mut closes = HashMap::new();

        for caps in self.tags.captures_iter(markup) {
            let Some(tag) = caps.get(0) else { continue };
            let closing = caps.get(1).is_some_and(|m| !m.is_empty());

            if closing {
                if let Some(start) = open_starts.pop() {
                    closes.insert(start, tag.range());
                }
            } else if !tag.as_str().ends_with("/>") {
                open_starts.push(tag.start());
            }
        }

        closes
    }
}

/// A pattern for an element's open tag plus the scanner for its close tag
#[derive(Debug, Clone)]
struct BlockPattern {
    name: &'static str,
    open: Regex,
    scanner: TagScanner,
}

impl BlockPattern {
    fn new(name: &'static str, tag: &str, open: &str) -> Self {
        Self {
            name,
            open: Regex::new(open).expect("valid block pattern"),
            scanner: TagScanner::new(tag),
        }
    }

    fn element(name: &'static str, tag: &str) -> Self {
        Self::new(name, tag, &format!(r"(?i)<{tag}\b[^>]*>"))
    }

    fn div_with(name: &'static str, attribute: &str, needle: &str) -> Self {
        Self::new(
            name,
            "div",
            &format!(
                r#"(?i)<div\b[^>]*\b{attribute}\s*=\s*["'][^"']*(?:{needle})[^"']*["'][^>]*>"#
            ),
        )
    }

    /// Inner span of the first complete match
    fn find_inner(&self, markup: &str) -> Option<Range<usize>> {
        let mut open_tags = self.open.find_iter(markup).peekable();
        open_tags.peek()?;

        let closes = self.scanner.pair_closes(markup);
        open_tags.find_map(|open| {
            closes
                .get(&open.start())
                .map(|close| open.end()..close.start)
        })
    }

    /// Remove every complete match, open tag through matching close tag
    ///
    /// An open tag that is never closed is left in place.
    fn remove_all(&self, markup: &str) -> String {
        if !self.open.is_match(markup) {
            return markup.to_string();
        }

        let closes = self.scanner.pair_closes(markup);
        let mut output = String::with_capacity(markup.len());
        let mut cursor = 0;

        while let Some(open) = self.open.find_at(markup, cursor) {
            match closes.get(&open.start()) {
                Some(close) => {
                    output.push_str(&markup[cursor..open.start()]);
                    cursor = close.end;
                }
                None => {
                    output.push_str(&markup[cursor..open.end()]);
                    cursor = open.end();
                }
            }
        }

        output.push_str(&markup[cursor..]);
        output
    }
}

/// Content extraction functionality
#[derive(Debug, Clone)]
pub struct MainContentExtractor {
    containers: Vec<BlockPattern>,
    noise: Vec<BlockPattern>,
    max_chars: usize,
}

impl MainContentExtractor {
    /// Create an extractor truncating at [`MAX_CONTENT_CHARS`]
    pub fn new() -> Self {
        Self::with_max_chars(MAX_CONTENT_CHARS)
    }

    /// Create an extractor truncating at `max_chars` characters
    pub fn with_max_chars(max_chars: usize) -> Self {
        // priority order: first pattern found anywhere in the page wins
        let containers = vec![
            BlockPattern::element("article", "article"),
            BlockPattern::div_with("div.content", "class", "content"),
            BlockPattern::div_with("div.main", "class", "main"),
            BlockPattern::div_with("div#content", "id", "content"),
            BlockPattern::div_with("div.post", "class", "post"),
            BlockPattern::div_with("div.entry", "class", "entry"),
        ];

        let noise = vec![
            BlockPattern::element("header", "header"),
            BlockPattern::element("nav", "nav"),
            BlockPattern::element("footer", "footer"),
            BlockPattern::element("aside", "aside"),
            BlockPattern::element("form", "form"),
            BlockPattern::div_with("div.noise", "class", "comment|sidebar|menu|nav|ad"),
        ];

        Self {
            containers,
            noise,
            max_chars,
        }
    }

    /// Extract the main content of a page as structured plain text
    pub fn extract_main(&self, markup: &str) -> String {
        self.extract(markup).text
    }

    /// Extract the main content together with how it was found
    #[instrument(skip(self, markup), fields(markup_len = markup.len()))]
    pub fn extract(&self, markup: &str) -> ExtractedContent {
        let sanitizer = TextSanitizer::shared();
        let cleaned = sanitizer.remove_code_blocks(markup);

        let found = self
            .find_container(&cleaned)
            .map(|(name, inner)| (inner.to_string(), name));

        let (fragment, container) = match found {
            Some((inner, name)) => (inner, Some(name.to_string())),
            None => (self.remove_noise(cleaned), None),
        };

        let text = sanitizer.render_structured(&fragment);
        let (text, truncated) = truncate_chars(text, self.max_chars);

        debug!(
            "Extracted {} chars, container={:?}, truncated={}",
            text.chars().count(),
            container,
            truncated
        );

        ExtractedContent {
            text,
            container,
            truncated,
        }
    }

    /// First container pattern present in the page, with its inner markup
    fn find_container<'a>(&self, markup: &'a str) -> Option<(&'static str, &'a str)> {
        self.containers.iter().find_map(|pattern| {
            pattern
                .find_inner(markup)
                .map(|inner| (pattern.name, &markup[inner]))
        })
    }

    /// Subtractive cleanup of a document already stripped of code blocks
    fn remove_noise(&self, cleaned: String) -> String {
        self.noise
            .iter()
            .fold(cleaned, |html, pattern| pattern.remove_all(&html))
    }
}

impl Default for MainContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Cut `text` to `max_chars` characters, appending [`TRUNCATION_MARKER`]
fn truncate_chars(text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut truncated = text[..byte_index].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            (truncated, true)
        }
        None => (text, false),
    }
}
