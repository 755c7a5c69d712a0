//! End-to-end scan scenarios: incremental rebuilds, pruning, and the
//! on-disk formats consumed by the search client.

use dexi::index::SearchIndex;
use dexi::utils::Stopwords;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    scan_dir: PathBuf,
    output_dir: PathBuf,
    private_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let scan_dir = dir.path().join("html");
        fs::create_dir_all(&scan_dir).unwrap();
        Self {
            scan_dir,
            output_dir: dir.path().join("out"),
            private_dir: dir.path().join("private"),
            _dir: dir,
        }
    }

    fn engine(&self) -> SearchIndex {
        SearchIndex::with_stop_words(
            self.scan_dir.clone(),
            self.output_dir.clone(),
            self.private_dir.clone(),
            Stopwords::from_words(["the", "a"]),
        )
        .unwrap()
    }

    fn write_page(&self, name: &str, sections: &str) {
        let path = self.scan_dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!(
                "<html><body><div id=\"main\">{}</div></body></html>",
                sections
            ),
        )
        .unwrap();
    }

    fn stale(&self, names: &[&str]) -> BTreeSet<PathBuf> {
        names.iter().map(|n| self.scan_dir.join(n)).collect()
    }

    fn search_path(&self, name: &str) -> PathBuf {
        self.output_dir.join("search").join(name)
    }

    fn fragment_path(&self, name: &str) -> PathBuf {
        self.output_dir.join("fragments").join(name)
    }

    /// Parse the persisted full index snapshot
    fn read_index(&self) -> BTreeMap<String, Vec<String>> {
        let contents = fs::read_to_string(self.private_dir.join("search.json")).unwrap();
        serde_json::from_str(&contents).unwrap()
    }

    /// Parse a published per-token record
    fn read_token_record(&self, token: &str) -> (String, Vec<String>) {
        let contents = fs::read_to_string(self.search_path(token)).unwrap();
        let json = unwrap_callback(&contents, "urls_downloaded_cb");
        let value: Value = serde_json::from_str(&json).unwrap();
        let urls = value["urls"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u.as_str().unwrap().to_string())
            .collect();
        (value["token"].as_str().unwrap().to_string(), urls)
    }

    /// Parse a published fragment record
    fn read_fragment(&self, file_name: &str) -> (String, String) {
        let path = self.fragment_path(file_name);
        let contents = fs::read_to_string(path).unwrap();
        let json = unwrap_callback(&contents, "fragment_downloaded_cb");
        let value: Value = serde_json::from_str(&json).unwrap();
        (
            value["url"].as_str().unwrap().to_string(),
            value["fragment"].as_str().unwrap().to_string(),
        )
    }
}

fn unwrap_callback(contents: &str, callback: &str) -> String {
    contents
        .strip_prefix(&format!("{}(", callback))
        .and_then(|s| s.strip_suffix(");"))
        .unwrap_or_else(|| panic!("not wrapped in {}: {}", callback, contents))
        .to_string()
}

fn titled_section(id: &str, title: &str, body: &str) -> String {
    format!(
        r#"<div id="{}">
             <ul class="base_symbol_header"><li><h3><span><code>{}</code></span></h3></li></ul>
             <p>{}</p>
           </div>"#,
        id, title, body
    )
}

fn plain_section(id: &str, body: &str) -> String {
    format!(r#"<div id="{}"><p>{}</p></div>"#, id, body)
}

/// Page with two sections: `#a` has "Widget" in its title, `#b` mentions
/// "widget factory" in its body.
fn widget_page(with_b: bool) -> String {
    let mut sections = titled_section("a", "Widget", "Builds things.");
    if with_b {
        sections.push_str(&plain_section("b", "the widget factory"));
    }
    sections
}

#[test]
fn scenario_title_priority_and_case_variant() {
    let fx = Fixture::new();
    fx.write_page("file.html", &widget_page(true));

    fx.engine().scan(&fx.stale(&["file.html"])).unwrap();

    let index = fx.read_index();
    // Literal mixed-case token only matched in the title
    assert_eq!(index["Widget"], vec!["file.html#a"]);
    // Lowercase variant merges both sections, title-priority first
    assert_eq!(index["widget"], vec!["file.html#a", "file.html#b"]);
    assert_eq!(index["factory"], vec!["file.html#b"]);
    // Stopwords never reach the index
    assert!(!index.contains_key("the"));

    let (token, urls) = fx.read_token_record("widget");
    assert_eq!(token, "widget");
    assert_eq!(urls, vec!["file.html#a", "file.html#b"]);

    let (url, fragment) = fx.read_fragment("file.html-a.fragment");
    assert_eq!(url, "file.html#a");
    assert!(fragment.contains("Widget"));
    assert!(fragment.contains("Builds"));
    assert!(fragment.contains("things"));
    let (_, fragment_b) = fx.read_fragment("file.html-b.fragment");
    // Stopwords survive in the reconstructed text
    assert!(fragment_b.contains("the"));
    assert!(fragment_b.contains("widget"));
    assert!(fragment_b.contains("factory"));
}

#[test]
fn trie_matches_index_after_save() {
    let fx = Fixture::new();
    fx.write_page("file.html", &widget_page(true));

    let mut engine = fx.engine();
    engine.scan(&fx.stale(&["file.html"])).unwrap();

    let trie_tokens: BTreeSet<_> = engine.trie().tokens().into_iter().collect();
    let index_tokens: BTreeSet<_> = fx.read_index().into_keys().collect();
    assert_eq!(trie_tokens, index_tokens);

    // The published trie is loadable script content
    let js = fs::read_to_string(fx.output_dir.join("trie_index.js")).unwrap();
    assert!(js.starts_with("var trie_index = "));
}

#[test]
fn idempotent_rescan() {
    let fx = Fixture::new();
    fx.write_page("file.html", &widget_page(true));
    let stale = fx.stale(&["file.html"]);

    let mut engine = fx.engine();
    engine.scan(&stale).unwrap();
    let first = fx.read_index();

    engine.scan(&stale).unwrap();
    let second = fx.read_index();

    assert_eq!(first, second);
    let trie_tokens: BTreeSet<_> = engine.trie().tokens().into_iter().collect();
    let index_tokens: BTreeSet<_> = second.into_keys().collect();
    assert_eq!(trie_tokens, index_tokens);
}

#[test]
fn rescan_with_removed_section_prunes_locations() {
    let fx = Fixture::new();
    fx.write_page("file.html", &widget_page(true));
    let stale = fx.stale(&["file.html"]);

    let mut engine = fx.engine();
    engine.scan(&stale).unwrap();

    // Section #b disappears from the page source
    fx.write_page("file.html", &widget_page(false));
    engine.scan(&stale).unwrap();

    let index = fx.read_index();
    assert_eq!(index["widget"], vec!["file.html#a"]);
    // "factory" lost its only location: gone from the index, the trie,
    // and the output directory
    assert!(!index.contains_key("factory"));
    assert!(!engine.trie().contains("factory"));
    assert!(!fx.search_path("factory").exists());
    assert!(!fx
        .fragment_path("file.html-b.fragment")
        .exists());
    for locations in index.values() {
        assert!(!locations.contains(&"file.html#b".to_string()));
    }
}

#[test]
fn deleted_page_is_pruned_not_reindexed() {
    let fx = Fixture::new();
    fx.write_page("file.html", &widget_page(true));
    let stale = fx.stale(&["file.html"]);

    let mut engine = fx.engine();
    engine.scan(&stale).unwrap();
    assert!(!fx.read_index().is_empty());

    fs::remove_file(fx.scan_dir.join("file.html")).unwrap();
    engine.scan(&stale).unwrap();

    assert!(fx.read_index().is_empty());
    assert!(engine.trie().is_empty());
    assert!(!fx
        .fragment_path("file.html-a.fragment")
        .exists());
    assert!(!fx.search_path("Widget").exists());
}

#[test]
fn token_emptied_at_load_is_reregistered_at_save() {
    let fx = Fixture::new();
    fx.write_page("file.html", &plain_section("x", "ephemeral token"));
    let stale = fx.stale(&["file.html"]);

    let mut engine = fx.engine();
    engine.scan(&stale).unwrap();
    assert!(engine.trie().contains("ephemeral"));

    // Rescanning the unchanged page empties "ephemeral" during load (its
    // only location is pruned) and repopulates it during fill; save must
    // re-register it in the trie and re-materialize its record.
    engine.scan(&stale).unwrap();
    assert!(engine.trie().contains("ephemeral"));
    assert!(fx.search_path("ephemeral").exists());
    assert_eq!(fx.read_index()["ephemeral"], vec!["file.html#x"]);
}

#[test]
fn partial_rescan_keeps_other_pages_contributions() {
    let fx = Fixture::new();
    fx.write_page("one.html", &plain_section("a", "shared term"));
    fx.write_page("two.html", &plain_section("b", "shared term"));

    let mut engine = fx.engine();
    engine.scan(&fx.stale(&["one.html", "two.html"])).unwrap();

    // Only one.html is stale the second time around
    engine.scan(&fx.stale(&["one.html"])).unwrap();

    let (_, urls) = fx.read_token_record("shared");
    let urls: BTreeSet<_> = urls.into_iter().collect();
    assert_eq!(
        urls,
        BTreeSet::from(["one.html#a".to_string(), "two.html#b".to_string()])
    );
    let index = fx.read_index();
    assert_eq!(index["shared"].len(), 2);
}

#[test]
fn page_without_content_root_is_skipped() {
    let fx = Fixture::new();
    fs::write(
        fx.scan_dir.join("plain.html"),
        "<html><body><p>hand-written page</p></body></html>",
    )
    .unwrap();
    fx.write_page("docs.html", &plain_section("a", "indexed content"));

    fx.engine()
        .scan(&fx.stale(&["plain.html", "docs.html"]))
        .unwrap();

    let index = fx.read_index();
    assert!(index.contains_key("indexed"));
    assert!(!index.contains_key("hand"));
}

#[test]
fn first_run_without_private_state() {
    let fx = Fixture::new();
    fx.engine().scan(&BTreeSet::new()).unwrap();

    assert!(fx.private_dir.join("search.trie").exists());
    assert!(fx.read_index().is_empty());
    assert!(fx.output_dir.join("trie_index.js").exists());
}

#[test]
fn token_named_like_store_directory_is_indexed() {
    let fx = Fixture::new();
    // "fragments" and "search" are ordinary prose words; their token
    // records must not collide with the engine's own directories
    fx.write_page("file.html", &plain_section("a", "search several fragments here"));

    fx.engine().scan(&fx.stale(&["file.html"])).unwrap();

    let (token, urls) = fx.read_token_record("fragments");
    assert_eq!(token, "fragments");
    assert_eq!(urls, vec!["file.html#a"]);
    assert!(fx.search_path("fragments").is_file());
    let (_, urls) = fx.read_token_record("search");
    assert_eq!(urls, vec!["file.html#a"]);
    let (_, fragment) = fx.read_fragment("file.html-a.fragment");
    assert!(fragment.contains("fragments"));
}

#[test]
fn pages_in_subdirectories() {
    let fx = Fixture::new();
    fx.write_page(
        "guide/intro.html",
        &plain_section("overview", "nested pages work"),
    );

    fx.engine().scan(&fx.stale(&["guide/intro.html"])).unwrap();

    let index = fx.read_index();
    assert_eq!(index["nested"], vec!["guide/intro.html#overview"]);
    assert!(fx
        .fragment_path("guide/intro.html-overview.fragment")
        .exists());
}
