// Book catalog search over HTTP+JSON
//
// Thin glue for the presentation layer; the playback session never
// talks to the catalog directly.

pub mod book;
pub mod client;

// Re-export commonly used types
pub use book::Book;
pub use client::{CatalogClient, DEFAULT_SEARCH_URL};
