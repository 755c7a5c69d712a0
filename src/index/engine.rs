//! The incremental scan engine.
//!
//! A scan is one linear pass over a set of stale pages:
//!
//! 1. **load** - drop the stale pages' fragments, reload the persisted trie
//!    and full index, and prune every location that belonged to a stale
//!    page. Tokens left without locations disappear from the trie and from
//!    the output directory.
//! 2. **fill** - re-tokenize every stale page that still exists, recording
//!    title tokens with priority and body tokens without, and regenerate
//!    each section's fragment.
//! 3. **save** - rewrite the per-token output file for every token touched
//!    this run, then persist the trie (both forms) and the full index.
//!
//! There is no intermediate persistence and no locking: the caller must
//! serialize scans against one store (one scan per documentation build).
//! A crash mid-scan can leave the persisted structures mutually
//! inconsistent, in which case the next full scan repairs them.

use crate::fragments::FragmentStore;
use crate::html::{self, Page};
use crate::index::inverted::InvertedIndex;
use crate::trie::Trie;
use crate::utils::{tokenize, Stopwords};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rustc_hash::FxHashSet;
use scraper::ElementRef;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Private trie serialization, reloaded across runs
const TRIE_FILE: &str = "search.trie";
/// Private full index snapshot, reloaded across runs
const INDEX_FILE: &str = "search.json";
/// Public trie encoding consumed by the search client
const TRIE_INDEX_FILE: &str = "trie_index.js";

#[derive(Serialize)]
struct TokenRecord<'a> {
    token: &'a str,
    urls: &'a [String],
}

/// Incremental search index over a documentation output tree
pub struct SearchIndex {
    scan_dir: PathBuf,
    output_dir: PathBuf,
    private_dir: PathBuf,
    stop_words: Stopwords,
    index: InvertedIndex,
    trie: Trie,
    fragments: FragmentStore,
}

impl SearchIndex {
    /// Create an engine with the embedded stopword list
    pub fn new(scan_dir: PathBuf, output_dir: PathBuf, private_dir: PathBuf) -> Result<Self> {
        Self::with_stop_words(scan_dir, output_dir, private_dir, Stopwords::default())
    }

    /// Create an engine with a caller-provided stopword set
    pub fn with_stop_words(
        scan_dir: PathBuf,
        output_dir: PathBuf,
        private_dir: PathBuf,
        stop_words: Stopwords,
    ) -> Result<Self> {
        // Token records are written directly under the search directory,
        // one file per token, so the fragment store must live outside it:
        // any token spelling a subdirectory name would collide otherwise.
        let search_dir = output_dir.join("search");
        let fragments_dir = output_dir.join("fragments");
        for dir in [&search_dir, &fragments_dir, &private_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        Ok(Self {
            scan_dir,
            output_dir,
            private_dir,
            stop_words,
            index: InvertedIndex::new(),
            trie: Trie::new(),
            fragments: FragmentStore::new(fragments_dir),
        })
    }

    /// Run one full scan: load, fill, save
    pub fn scan(&mut self, stale_filenames: &BTreeSet<PathBuf>) -> Result<()> {
        info!("scanning {} stale page(s)", stale_filenames.len());
        self.load(stale_filenames)?;
        self.fill(stale_filenames)?;
        self.save()
    }

    /// Trie state, synchronized with the full index at save time
    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    /// In-memory index state
    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    fn search_dir(&self) -> PathBuf {
        self.output_dir.join("search")
    }

    /// Phase 1: prune state owned by the stale pages.
    ///
    /// Always starts from a fresh in-memory index so one engine value can
    /// run consecutive scans; persisted state is the only carry-over.
    fn load(&mut self, stale_filenames: &BTreeSet<PathBuf>) -> Result<()> {
        self.index = InvertedIndex::new();
        self.trie = Trie::new();

        let mut removed = FxHashSet::default();
        for filename in stale_filenames {
            let Some(url) = self.relative_url(filename) else {
                continue;
            };
            for fragment in self.fragments.list_for_source(&url)? {
                self.fragments.delete(&fragment)?;
                removed.insert(fragment.location);
            }
        }

        let trie_path = self.private_dir.join(TRIE_FILE);
        if trie_path.exists() {
            self.trie = Trie::from_file(&trie_path)?;
        }

        let index_path = self.private_dir.join(INDEX_FILE);
        if index_path.exists() {
            let contents = fs::read_to_string(&index_path)
                .with_context(|| format!("Failed to read {}", index_path.display()))?;
            let snapshot: BTreeMap<String, Vec<String>> = serde_json::from_str(&contents)
                .with_context(|| format!("Corrupt index snapshot: {}", index_path.display()))?;
            self.index.load_full(snapshot);
        }

        let dropped = self.index.prune(&removed);
        debug!(
            "pruned {} fragment(s), dropped {} token(s)",
            removed.len(),
            dropped.len()
        );
        for token in &dropped {
            self.trie.remove(token);
            remove_if_exists(&self.search_dir().join(token))?;
        }

        Ok(())
    }

    /// Phase 2: re-tokenize every stale page that still exists
    fn fill(&mut self, stale_filenames: &BTreeSet<PathBuf>) -> Result<()> {
        for filename in stale_filenames {
            if !filename.exists() {
                // Deleted pages were pruned in load, nothing to re-index
                continue;
            }
            let Some(url) = self.relative_url(filename) else {
                warn!(
                    "invalid-html: {} is outside the scan directory, skipping",
                    filename.display()
                );
                continue;
            };

            let contents = match fs::read_to_string(filename) {
                Ok(contents) => contents,
                Err(err) => {
                    warn!(
                        "invalid-html: failed to read {}: {}, skipping",
                        filename.display(),
                        err
                    );
                    continue;
                }
            };

            let page = Page::parse(&contents);
            let Some(root) = page.content_root() else {
                warn!(
                    "invalid-html: no content root in {}, skipping",
                    filename.display()
                );
                continue;
            };

            debug!("indexing {}", url);
            for section in html::sections(root) {
                let Some(id) = html::section_id(section) else {
                    continue;
                };
                let location = format!("{}#{}", url, id);

                let mut text = String::new();
                index_elements(
                    &mut self.index,
                    &self.stop_words,
                    html::title_elements(section),
                    &location,
                    true,
                    &mut text,
                );
                index_elements(
                    &mut self.index,
                    &self.stop_words,
                    html::body_elements(section),
                    &location,
                    false,
                    &mut text,
                );

                self.fragments.write(&location, &text)?;
            }
        }

        Ok(())
    }

    /// Phase 3: rewrite touched per-token files, then both persisted
    /// structures. After this the trie's token set equals the full index's
    /// key set.
    fn save(&mut self) -> Result<()> {
        let search_dir = self.search_dir();
        let touched = self.index.touched_tokens();
        info!("saving {} touched token(s)", touched.len());

        for token in &touched {
            self.trie.insert(token);

            let urls = self.index.locations(token);
            let path = search_dir.join(token);
            let file = File::create(&path)
                .with_context(|| format!("Failed to write token record: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writer.write_all(b"urls_downloaded_cb(")?;
            serde_json::to_writer(&mut writer, &TokenRecord { token, urls: &urls })?;
            writer.write_all(b");")?;
            writer.flush()?;
        }

        self.trie.to_file(
            &self.private_dir.join(TRIE_FILE),
            &self.output_dir.join(TRIE_INDEX_FILE),
        )?;

        let index_path = self.private_dir.join(INDEX_FILE);
        let file = File::create(&index_path)
            .with_context(|| format!("Failed to write {}", index_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.index.snapshot())?;
        writer.flush()?;

        Ok(())
    }

    /// Relative URL of a page under the scan directory, `/`-separated
    fn relative_url(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.scan_dir).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

/// Tokenize a run of elements into the index, accumulating the section's
/// reconstructed fragment text. Mixed-case tokens are indexed twice, once
/// literally and once lowercased, both against the same location.
fn index_elements(
    index: &mut InvertedIndex,
    stop_words: &Stopwords,
    elements: Vec<ElementRef<'_>>,
    location: &str,
    prioritized: bool,
    text: &mut String,
) {
    for element in elements {
        let block = html::text(element);
        for event in tokenize(&block, stop_words) {
            text.push_str(event.text());
            if let Some(token) = event.token() {
                index.record(token, location, prioritized);
                if token.chars().any(|c| c.is_uppercase()) {
                    index.record(&token.to_lowercase(), location, prioritized);
                }
            }
        }
        text.push('\n');
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("Failed to delete {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_url() {
        let dir = tempfile::tempdir().unwrap();
        let scan_dir = dir.path().join("html");
        let engine = SearchIndex::new(
            scan_dir.clone(),
            dir.path().join("out"),
            dir.path().join("private"),
        )
        .unwrap();

        assert_eq!(
            engine.relative_url(&scan_dir.join("guide").join("page.html")),
            Some("guide/page.html".to_string())
        );
        assert_eq!(engine.relative_url(Path::new("/elsewhere/page.html")), None);
        assert_eq!(engine.relative_url(&scan_dir), None);
    }

    #[test]
    fn test_new_prepares_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        SearchIndex::new(dir.path().join("html"), out.clone(), dir.path().join("p")).unwrap();
        assert!(out.join("search").is_dir());
        assert!(out.join("fragments").is_dir());
        // Construction is idempotent over existing directories
        SearchIndex::new(dir.path().join("html"), out.clone(), dir.path().join("p")).unwrap();
    }
}
