//! # Dexi - incremental documentation search indexer
//!
//! Dexi builds a full-text, prefix-searchable index over a corpus of
//! generated documentation pages. A browser-side search box resolves a
//! typed prefix against the published trie, fetches the ranked location
//! list for the chosen token, and displays a stored snippet per hit.
//!
//! ## Architecture
//!
//! - [`index`] - the inverted index and the load/fill/save scan engine
//! - [`trie`] - prefix trie over indexed tokens, with private (reloadable)
//!   and public (client-consumed) serializations
//! - [`fragments`] - per-section snippet store
//! - [`html`] - structural queries over documentation pages
//! - [`utils`] - tokenizer and stopword handling
//!
//! ## Quick start
//!
//! ```no_run
//! use dexi::index::SearchIndex;
//! use std::collections::BTreeSet;
//! use std::path::PathBuf;
//!
//! let mut engine = SearchIndex::new(
//!     PathBuf::from("html"),
//!     PathBuf::from("html"),
//!     PathBuf::from(".dexi"),
//! ).unwrap();
//!
//! // Re-index the pages that changed since the last build
//! let stale: BTreeSet<PathBuf> = [PathBuf::from("html/page.html")].into();
//! engine.scan(&stale).unwrap();
//! ```
//!
//! ## Incremental model
//!
//! Only pages flagged stale by the build system are re-read. Everything a
//! stale page contributed (index postings, trie entries, fragments) is
//! pruned first, then the page is re-tokenized if it still exists, so a
//! deleted page simply disappears from the index. Persisted state lives in
//! a private directory (`search.trie`, `search.json`) and the published
//! output (`search/<token>` records, `trie_index.js`, fragments) is
//! rewritten only where the scan touched it.

pub mod fragments;
pub mod html;
pub mod index;
pub mod trie;
pub mod utils;
