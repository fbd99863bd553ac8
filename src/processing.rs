//! Markup to text conversion
//!
//! Pattern-based helpers that turn fetched HTML into plain text. Nothing here
//! builds a DOM: every step is a whole-document regex substitution, which
//! keeps the behaviour predictable on broken markup at the cost of some
//! accuracy on deeply nested or overlapping tags.
//!
//! Two renderings are offered:
//!
//! - [`TextSanitizer::sanitize`] flattens a document to a single line of text
//! - [`TextSanitizer::render_structured`] keeps headings, paragraphs, line
//!   breaks and list items as newline/bullet conventions
//!
//! # Example
//!
//! ```rust
//! use ddg_proxy::processing::sanitize;
//!
//! let html = r#"<nav>Home</nav><script>evil();</script><p>Hello   <b>world</b></p>"#;
//! assert_eq!(sanitize(html), "Hello world");
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::{instrument, trace};

/// Entities decoded by [`TextSanitizer::decode_entities`], ampersand last
const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

static SHARED: LazyLock<TextSanitizer> = LazyLock::new(TextSanitizer::new);

/// Build a lazy, case-insensitive pattern matching a whole `<tag>...</tag>`
/// block up to the nearest close tag
fn block_pattern(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("valid block pattern")
}

/// Pre-compiled patterns for turning markup into text
#[derive(Debug, Clone)]
pub struct TextSanitizer {
    /// `<script>` and `<style>` blocks
    code_blocks: Vec<Regex>,
    /// `<nav>`, `<header>` and `<footer>` blocks
    chrome_blocks: Vec<Regex>,
    comment_regex: Regex,
    tag_regex: Regex,
    whitespace_regex: Regex,
    heading_regex: Regex,
    paragraph_regex: Regex,
    line_break_regex: Regex,
    list_item_regex: Regex,
    list_regex: Regex,
    horizontal_space_regex: Regex,
    blank_lines_regex: Regex,
}

impl TextSanitizer {
    /// Compile all patterns
    pub fn new() -> Self {
        Self {
            code_blocks: ["script", "style"].into_iter().map(block_pattern).collect(),
            chrome_blocks: ["nav", "header", "footer"]
                .into_iter()
                .map(block_pattern)
                .collect(),
            comment_regex: Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"),
            tag_regex: Regex::new(r"<[^>]+>").expect("valid tag pattern"),
            whitespace_regex: Regex::new(r"\s+").expect("valid whitespace pattern"),
            heading_regex: Regex::new(r"(?is)<h[1-6]\b[^>]*>(.*?)</h[1-6]\s*>")
                .expect("valid heading pattern"),
            paragraph_regex: Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>")
                .expect("valid paragraph pattern"),
            line_break_regex: Regex::new(r"(?i)<br\b[^>]*>").expect("valid line break pattern"),
            list_item_regex: Regex::new(r"(?is)<li\b[^>]*>(.*?)</li\s*>")
                .expect("valid list item pattern"),
            list_regex: Regex::new(r"(?i)</?(?:ul|ol)\b[^>]*>").expect("valid list pattern"),
            horizontal_space_regex: Regex::new(r"[^\S\n]+").expect("valid space pattern"),
            blank_lines_regex: Regex::new(r"\n{3,}").expect("valid newline pattern"),
        }
    }

    /// Process-wide instance, compiled on first use
    pub fn shared() -> &'static TextSanitizer {
        &SHARED
    }

    /// Flatten markup into a single line of plain text
    ///
    /// In order: drop script and style blocks, drop nav/header/footer
    /// blocks, replace every remaining tag with a space, then collapse
    /// whitespace and trim. A start tag without a matching close tag is left
    /// in place and only loses the tag itself.
    #[instrument(skip(self, markup), fields(markup_len = markup.len()))]
    pub fn sanitize(&self, markup: &str) -> String {
        let mut text = markup.to_string();

        for pattern in self.code_blocks.iter().chain(&self.chrome_blocks) {
            text = pattern.replace_all(&text, "").into_owned();
        }

        let text = self.tag_regex.replace_all(&text, " ");
        let text = self.whitespace_regex.replace_all(&text, " ");

        trace!("Sanitized {} -> {} bytes", markup.len(), text.len());
        text.trim().to_string()
    }

    /// Remove script blocks, style blocks and comments
    pub fn remove_code_blocks(&self, markup: &str) -> String {
        let mut text = self.comment_regex.replace_all(markup, "").into_owned();
        for pattern in &self.code_blocks {
            text = pattern.replace_all(&text, "").into_owned();
        }
        text
    }

    /// Replace tags with spaces, collapse whitespace and trim
    ///
    /// Used for short inline fragments such as result titles.
    pub fn strip_tags(&self, fragment: &str) -> String {
        let text = self.tag_regex.replace_all(fragment, " ");
        self.whitespace_regex
            .replace_all(&text, " ")
            .trim()
            .to_string()
    }

    /// Render a content fragment as text while keeping its block structure
    ///
    /// Headings become paragraphs of their own, `<p>` contents sit on their
    /// own lines, `<br>` becomes a newline and `<li>` a `• ` bullet line.
    /// Every other tag becomes a space, a small set of entities is decoded
    /// and runs of blank lines are collapsed to a single blank line.
    #[instrument(skip(self, fragment), fields(fragment_len = fragment.len()))]
    pub fn render_structured(&self, fragment: &str) -> String {
        let text = self.heading_regex.replace_all(fragment, "\n\n${1}\n\n");
        let text = self.paragraph_regex.replace_all(&text, "\n${1}\n");
        let text = self.line_break_regex.replace_all(&text, "\n");
        let text = self.list_item_regex.replace_all(&text, "\n• ${1}");
        let text = self.list_regex.replace_all(&text, "\n");
        let text = self.tag_regex.replace_all(&text, " ");
        let text = Self::decode_entities(&text);

        let text = self.horizontal_space_regex.replace_all(&text, " ");
        let text = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
        let text = self.blank_lines_regex.replace_all(&text, "\n\n");

        text.trim().to_string()
    }

    /// Decode `&nbsp;`, `&lt;`, `&gt;`, `&quot;`, `&#39;` and `&amp;`
    ///
    /// `&amp;` is decoded last so `&amp;lt;` yields the literal text `&lt;`.
    pub fn decode_entities(text: &str) -> String {
        if !text.contains('&') {
            return text.to_string();
        }

        let mut result = text.to_string();
        for (entity, replacement) in ENTITIES {
            result = result.replace(entity, replacement);
        }
        result
    }
}

impl Default for TextSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten markup to plain text with the shared [`TextSanitizer`]
pub fn sanitize(markup: &str) -> String {
    TextSanitizer::shared().sanitize(markup)
}

/// Render a fragment with structure using the shared [`TextSanitizer`]
pub fn render_structured(fragment: &str) -> String {
    TextSanitizer::shared().render_structured(fragment)
}
