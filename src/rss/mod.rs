//! RSS feed module for the PubMed filter.
//!
//! This module handles fetching and parsing the source feed and writing the
//! generated RSS 2.0 feeds.

mod client;
mod fetcher;
mod parser;
mod types;
mod util;
mod writer;

pub use self::client::*;
pub use self::fetcher::*;
pub use self::parser::*;
pub use self::types::*;
pub use self::util::*;
pub use self::writer::*;
