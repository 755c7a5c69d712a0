//! Shared utilities.
//!
//! - [`stopwords`] - stopword set (embedded default list, optional file load)
//! - [`tokenizer`] - identifier-like token extraction with separator
//!   pass-through for fragment reconstruction

pub mod stopwords;
pub mod tokenizer;

pub use stopwords::Stopwords;
pub use tokenizer::{tokenize, TokenEvent, Tokenizer};
