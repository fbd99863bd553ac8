//! Content extraction
//!
//! - [`search`] turns a DuckDuckGo results page into ranked [`SearchResult`]s
//! - [`content`] isolates the main readable text of an arbitrary page

pub mod content;
pub mod search;

pub use content::{ExtractedContent, MainContentExtractor, MAX_CONTENT_CHARS, TRUNCATION_MARKER};
pub use search::{unwrap_redirect, SearchResult, SearchResultExtractor};
