// HTTP search client for the book catalog

use crate::book::Book;
use bookshelf_core::{PlaybackError, Result};
use std::time::Duration;

/// Catalog search endpoint; the query text goes in the `search` parameter
pub const DEFAULT_SEARCH_URL: &str = "https://kamorris.com/lab/abp/booksearch.php";

/// Create a configured HTTP agent with proper timeouts and settings
fn create_http_agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(10))
        .timeout_read(Duration::from_secs(30))
        .user_agent("BookshelfAudio/0.1")
        .build()
}

/// Book catalog client
pub struct CatalogClient {
    agent: ureq::Agent,
    search_url: String,
}

impl CatalogClient {
    pub fn new() -> Self {
        Self::with_search_url(DEFAULT_SEARCH_URL)
    }

    pub fn with_search_url(search_url: &str) -> Self {
        Self {
            agent: create_http_agent(),
            search_url: search_url.to_string(),
        }
    }

    /// Search the catalog for books matching the given text
    ///
    /// No matches yield an empty list, not an error.
    pub fn search(&self, text: &str) -> Result<Vec<Book>> {
        log::debug!("searching catalog for {:?}", text);

        let response = self
            .agent
            .get(&self.search_url)
            .query("search", text)
            .call()
            .map_err(|e| PlaybackError::Network(format!("book search failed: {}", e)))?;

        let payload = response
            .into_string()
            .map_err(|e| PlaybackError::Network(format!("book search read failed: {}", e)))?;

        parse_books(&payload)
    }
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a search response payload
pub fn parse_books(payload: &str) -> Result<Vec<Book>> {
    serde_json::from_str(payload)
        .map_err(|e| PlaybackError::Parse(format!("malformed book list: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "id": 1,
            "title": "Moby Dick",
            "author": "Herman Melville",
            "cover_url": "https://books.example/covers/1.jpg",
            "duration": 86220
        },
        {
            "id": 7,
            "title": "The Time Machine",
            "author": "H. G. Wells",
            "cover_url": "https://books.example/covers/7.jpg",
            "duration": 14460
        }
    ]"#;

    #[test]
    fn test_parse_search_response() {
        let books = parse_books(SAMPLE).unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].id, 1);
        assert_eq!(books[0].title, "Moby Dick");
        assert_eq!(books[1].author, "H. G. Wells");
        assert_eq!(books[1].duration_seconds().get(), 14_460);
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let books = parse_books("[]").unwrap();
        assert!(books.is_empty());
    }

    #[test]
    fn test_malformed_payload_is_a_parse_error() {
        let result = parse_books("{\"oops\": true}");
        match result {
            Err(PlaybackError::Parse(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_book_maps_to_catalog_track() {
        let books = parse_books(SAMPLE).unwrap();
        assert_eq!(
            books[0].track_ref(),
            bookshelf_core::TrackRef::Catalog(1)
        );
    }
}
