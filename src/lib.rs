//! dataset-scraper - resumable scrape-and-merge over JSON datasets
//!
//! A path query selects items inside a JSON document; each item is handed to
//! a handler whose result is merged back in place. The document and a small
//! checkpoint are persisted after every item so an interrupted run picks up
//! where it stopped.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod query;

pub use error::{ScrapeError, ScrapeResult};
