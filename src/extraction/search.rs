//! Search result extraction
//!
//! Pulls result entries out of DuckDuckGo's HTML results page
//! (`html.duckduckgo.com/html`). The page marks each result title anchor with
//! the `result__a` class and each snippet with `result__snippet`; titles and
//! snippets are scanned independently and paired by their order in the page.
//!
//! Sponsored entries (links through the `y.js` ad endpoint) are dropped and
//! DuckDuckGo's `//duckduckgo.com/l/?uddg=<encoded>` redirect links are
//! unwrapped to their real destination.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::processing::TextSanitizer;

/// Class marking a result's title anchor
pub const TITLE_MARKER: &str = "result__a";

/// Class marking a result's snippet element
pub const SNIPPET_MARKER: &str = "result__snippet";

/// Substring identifying a sponsored result link
pub const AD_MARKER: &str = "y.js";

/// Link prefixes of DuckDuckGo's redirect wrapper
pub const REDIRECT_PREFIXES: [&str; 2] = ["//duckduckgo.com/l/?", "https://duckduckgo.com/l/?"];

/// Query key of the redirect wrapper holding the encoded destination
pub const REDIRECT_KEY: &str = "uddg=";

/// A single search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    /// Result title with markup removed
    pub title: String,
    /// Destination URL
    pub link: String,
    /// Result summary, empty when the page had none
    pub snippet: String,
    /// 1-based rank among accepted results
    pub position: u32,
}

/// Extracts [`SearchResult`]s from a results page
#[derive(Debug, Clone)]
pub struct SearchResultExtractor {
    title_regex: Regex,
    href_regex: Regex,
    snippet_regex: Regex,
}

impl SearchResultExtractor {
    /// Compile the result patterns
    pub fn new() -> Self {
        Self {
            title_regex: Regex::new(&format!(
                r#"(?is)<a\b([^>]*\bclass\s*=\s*["'][^"']*\b{TITLE_MARKER}\b[^"']*["'][^>]*)>(.*?)</a\s*>"#
            ))
            .expect("valid title pattern"),
            href_regex: Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
                .expect("valid href pattern"),
            snippet_regex: Regex::new(&format!(
                r#"(?is)<(?:a|div|td|span)\b[^>]*\bclass\s*=\s*["'][^"']*\b{SNIPPET_MARKER}\b[^"']*["'][^>]*>(.*?)</(?:a|div|td|span)\s*>"#
            ))
            .expect("valid snippet pattern"),
        }
    }

    /// Extract at most `max_results` results from `markup`
    ///
    /// The k-th title anchor is paired with the k-th snippet. Ads and entries
    /// with an empty title or link are skipped without using up a position,
    /// so positions always run `1..=len`.
    #[instrument(skip(self, markup), fields(markup_len = markup.len()))]
    pub fn extract(&self, markup: &str, max_results: usize) -> Vec<SearchResult> {
        let mut results = Vec::new();
        if max_results == 0 {
            return results;
        }

        let sanitizer = TextSanitizer::shared();
        let snippets: Vec<&str> = self
            .snippet_regex
            .captures_iter(markup)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        for (index, caps) in self.title_regex.captures_iter(markup).enumerate() {
            if results.len() >= max_results {
                break;
            }

            let attributes = caps.get(1).map_or("", |m| m.as_str());
            let href = self.href(attributes);

            if href.contains(AD_MARKER) {
                trace!("Skipping sponsored result: {}", href);
                continue;
            }

            let link = unwrap_redirect(&href);
            let title = clean_text(sanitizer, caps.get(2).map_or("", |m| m.as_str()));
            if title.is_empty() || link.is_empty() {
                trace!("Skipping result with empty title or link");
                continue;
            }

            let snippet = snippets
                .get(index)
                .map(|raw| clean_text(sanitizer, raw))
                .unwrap_or_default();

            results.push(SearchResult {
                title,
                link,
                snippet,
                position: results.len() as u32 + 1,
            });
        }

        debug!(
            "Extracted {} results ({} snippets on page)",
            results.len(),
            snippets.len()
        );
        results
    }

    /// Entity-decoded `href` value of an anchor's attribute list
    fn href(&self, attributes: &str) -> String {
        self.href_regex
            .captures(attributes)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| TextSanitizer::decode_entities(m.as_str()))
            .unwrap_or_default()
    }
}

impl Default for SearchResultExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn clean_text(sanitizer: &TextSanitizer, fragment: &str) -> String {
    TextSanitizer::decode_entities(&sanitizer.strip_tags(fragment))
        .trim()
        .to_string()
}

/// Resolve a DuckDuckGo redirect link to its destination
///
/// Links without the wrapper prefix, or wrapped links lacking a `uddg`
/// value, are returned unchanged.
pub fn unwrap_redirect(href: &str) -> String {
    let Some(rest) = REDIRECT_PREFIXES
        .iter()
        .find_map(|prefix| href.strip_prefix(prefix))
    else {
        return href.to_string();
    };

    let Some(start) = rest.find(REDIRECT_KEY) else {
        return href.to_string();
    };

    let value = &rest[start + REDIRECT_KEY.len()..];
    let encoded = value.split('&').next().unwrap_or_default();
    if encoded.is_empty() {
        return href.to_string();
    }

    let decoded = urlencoding::decode_binary(encoded.as_bytes());
    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_block(href: &str, title: &str, snippet: &str) -> String {
        format!(
            r#"<div class="result results_links web-result">
                 <h2 class="result__title"><a rel="nofollow" class="result__a" href="{href}">{title}</a></h2>
                 <a class="result__snippet" href="{href}">{snippet}</a>
               </div>"#
        )
    }

    #[test]
    fn test_single_result() {
        let extractor = SearchResultExtractor::new();
        let html = r#"<a class="result__a" href="http://x.com">Hi</a><a class="result__snippet">Snip</a>"#;

        let results = extractor.extract(html, 10);

        assert_eq!(
            results,
            vec![SearchResult {
                title: "Hi".to_string(),
                link: "http://x.com".to_string(),
                snippet: "Snip".to_string(),
                position: 1,
            }]
        );
    }

    #[test]
    fn test_positions_are_contiguous_and_truncated() {
        let extractor = SearchResultExtractor::new();
        let html: String = (1..=5)
            .map(|i| result_block(&format!("https://site{i}.com"), &format!("Title {i}"), "s"))
            .collect();

        let results = extractor.extract(&html, 3);

        assert_eq!(results.len(), 3);
        assert_eq!(
            results.iter().map(|r| r.position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(results[2].title, "Title 3");
    }

    #[test]
    fn test_fewer_results_than_requested() {
        let extractor = SearchResultExtractor::new();
        let html = result_block("https://a.com", "A", "a") + &result_block("https://b.com", "B", "b");

        assert_eq!(extractor.extract(&html, 10).len(), 2);
    }

    #[test]
    fn test_zero_max_results() {
        let extractor = SearchResultExtractor::new();
        let html = result_block("https://a.com", "A", "a");

        assert!(extractor.extract(&html, 0).is_empty());
    }

    #[test]
    fn test_ads_do_not_consume_positions() {
        let extractor = SearchResultExtractor::new();
        let html = result_block(
            "https://duckduckgo.com/y.js?ad_domain=shop.com&amp;u3=x",
            "Buy now",
            "Sponsored",
        ) + &result_block("https://organic.com", "Organic", "Real result");

        let results = extractor.extract(&html, 10);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Organic");
        assert_eq!(results[0].position, 1);
        assert!(results.iter().all(|r| !r.link.contains(AD_MARKER)));
    }

    #[test]
    fn test_snippets_pair_by_title_index() {
        let extractor = SearchResultExtractor::new();
        // the ad owns snippet 0, so the organic result gets snippet 1
        let html = result_block("https://duckduckgo.com/y.js?x=1", "Ad", "ad snippet")
            + &result_block("https://organic.com", "Organic", "organic snippet");

        let results = extractor.extract(&html, 10);

        assert_eq!(results[0].snippet, "organic snippet");
    }

    #[test]
    fn test_missing_snippet_is_empty() {
        let extractor = SearchResultExtractor::new();
        let html = r#"<a class="result__a" href="https://a.com">A</a>
                      <a class="result__a" href="https://b.com">B</a>
                      <div class="result__snippet">only one</div>"#;

        let results = extractor.extract(html, 10);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippet, "only one");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn test_redirect_links_are_unwrapped() {
        let extractor = SearchResultExtractor::new();
        let html = result_block(
            "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2Flearn%3Fa%3D1%26b%3D2&amp;rut=abc123",
            "Learn Rust",
            "Get started",
        );

        let results = extractor.extract(&html, 10);

        assert_eq!(results[0].link, "https://www.rust-lang.org/learn?a=1&b=2");
    }

    #[test]
    fn test_markup_inside_title_and_snippet() {
        let extractor = SearchResultExtractor::new();
        let html = result_block(
            "https://docs.rs",
            "  <b>Rust</b>   Docs &amp; Crates ",
            "The <b>Rust</b> community&#39;s crate registry",
        );

        let results = extractor.extract(&html, 10);

        assert_eq!(results[0].title, "Rust Docs & Crates");
        assert_eq!(results[0].snippet, "The Rust community's crate registry");
    }

    #[test]
    fn test_empty_title_or_link_is_excluded() {
        let extractor = SearchResultExtractor::new();
        let html = result_block("https://a.com", "<img src=\"x.png\">", "no title")
            + r#"<a class="result__a">No link</a>"#
            + &result_block("https://b.com", "B", "b");

        let results = extractor.extract(&html, 10);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "B");
        assert_eq!(results[0].position, 1);
    }

    #[test]
    fn test_similar_class_names_are_not_titles() {
        let extractor = SearchResultExtractor::new();
        let html = r#"<a class="result__about" href="https://a.com">About</a>
                      <a class="result__url" href="https://a.com">a.com</a>"#;

        assert!(extractor.extract(html, 10).is_empty());
    }

    #[test]
    fn test_attribute_order_and_quotes() {
        let extractor = SearchResultExtractor::new();
        let html = r#"<A HREF='https://single.com' CLASS='result__a'>Single</A>"#;

        let results = extractor.extract(html, 10);

        assert_eq!(results[0].link, "https://single.com");
        assert_eq!(results[0].title, "Single");
    }

    #[test]
    fn test_unwrap_redirect() {
        assert_eq!(
            unwrap_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2F&rut=1"),
            "https://example.com/"
        );
        assert_eq!(
            unwrap_redirect("https://duckduckgo.com/l/?kh=-1&uddg=http%3A%2F%2Fa.b"),
            "http://a.b"
        );
        assert_eq!(unwrap_redirect("https://example.com/?uddg=x"), "https://example.com/?uddg=x");
        assert_eq!(unwrap_redirect("//duckduckgo.com/l/?rut=1"), "//duckduckgo.com/l/?rut=1");
        assert_eq!(unwrap_redirect("//duckduckgo.com/l/?uddg=a+b"), "a+b");
    }

    #[test]
    fn test_serialization_shape() {
        let result = SearchResult {
            title: "t".into(),
            link: "l".into(),
            snippet: "s".into(),
            position: 1,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "t", "link": "l", "snippet": "s", "position": 1})
        );
    }
}
