//! On-disk store for rendered search result snippets.
//!
//! One fragment is stored per section, at a path derived from the section's
//! location (`page.html#id` becomes `page.html-id.fragment`). Fragments are
//! fetched lazily by the search client, which loads them as scripts; each
//! file therefore wraps its JSON payload in a `fragment_downloaded_cb(...)`
//! call instead of being bare JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

const FRAGMENT_SUFFIX: &str = ".fragment";

#[derive(Serialize)]
struct FragmentRecord<'a> {
    url: &'a str,
    fragment: &'a str,
}

/// A stored fragment discovered under the store root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Absolute path of the fragment file
    pub path: PathBuf,
    /// Section location the fragment belongs to (`page.html#id`)
    pub location: String,
}

/// Fragment store rooted at a directory
#[derive(Debug, Clone)]
pub struct FragmentStore {
    root: PathBuf,
}

impl FragmentStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derived file path for a section location
    fn path_for(&self, location: &str) -> PathBuf {
        let name = format!("{}{}", location.replace('#', "-"), FRAGMENT_SUFFIX);
        self.root.join(name)
    }

    /// Persist a fragment, overwriting unconditionally and creating parent
    /// directories on demand.
    pub fn write(&self, location: &str, fragment: &str) -> Result<()> {
        let path = self.path_for(location);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = File::create(&path)
            .with_context(|| format!("Failed to write fragment: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(b"fragment_downloaded_cb(")?;
        serde_json::to_writer(
            &mut writer,
            &FragmentRecord {
                url: location,
                fragment,
            },
        )?;
        writer.write_all(b");")?;
        writer.flush()?;
        Ok(())
    }

    /// Every stored fragment belonging to one source page.
    ///
    /// A page `dir/page.html` owns the fragments `dir/page.html-<id>.fragment`;
    /// only the boundary character maps back to `#`, so dashes inside the
    /// page name or the section id survive untouched.
    pub fn list_for_source(&self, source_url: &str) -> Result<Vec<Fragment>> {
        let derived = self.root.join(source_url);
        let Some(dir) = derived.parent() else {
            return Ok(Vec::new());
        };
        let Some(file_prefix) = derived.file_name().map(|n| n.to_string_lossy().into_owned())
        else {
            return Ok(Vec::new());
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            // Nothing written for this page's directory yet
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to list fragments in {}", dir.display()));
            }
        };

        let mut fragments = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = name.strip_suffix(FRAGMENT_SUFFIX) else {
                continue;
            };
            let Some(rest) = stem.strip_prefix(&file_prefix) else {
                continue;
            };
            // `page.html-id` -> `page.html#id`
            let Some(id) = rest.strip_prefix('-') else {
                continue;
            };
            fragments.push(Fragment {
                path: entry.path(),
                location: format!("{}#{}", source_url, id),
            });
        }
        fragments.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(fragments)
    }

    /// Remove a stored fragment. An already-absent file is not an error.
    pub fn delete(&self, fragment: &Fragment) -> Result<()> {
        match fs::remove_file(&fragment.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to delete fragment: {}", fragment.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FragmentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FragmentStore::new(dir.path().join("fragments"));
        (dir, store)
    }

    #[test]
    fn test_write_wraps_payload() {
        let (_dir, store) = store();
        store.write("page.html#intro", "Intro text").unwrap();

        let path = store.root().join("page.html-intro.fragment");
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("fragment_downloaded_cb("));
        assert!(contents.ends_with(");"));
        assert!(contents.contains(r#""url":"page.html#intro""#));
        assert!(contents.contains(r#""fragment":"Intro text""#));
    }

    #[test]
    fn test_write_creates_nested_dirs() {
        let (_dir, store) = store();
        store.write("guide/deep/page.html#a", "text").unwrap();
        assert!(store
            .root()
            .join("guide/deep/page.html-a.fragment")
            .exists());
    }

    #[test]
    fn test_list_for_source() {
        let (_dir, store) = store();
        store.write("dir/page.html#a", "a").unwrap();
        store.write("dir/page.html#b-c", "b").unwrap();
        store.write("dir/other.html#a", "other").unwrap();

        let found = store.list_for_source("dir/page.html").unwrap();
        let locations: Vec<_> = found.iter().map(|f| f.location.as_str()).collect();
        assert_eq!(locations, vec!["dir/page.html#a", "dir/page.html#b-c"]);
    }

    #[test]
    fn test_list_for_source_with_dash_in_name() {
        let (_dir, store) = store();
        store.write("my-page.html#sec", "text").unwrap();

        let found = store.list_for_source("my-page.html").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location, "my-page.html#sec");
    }

    #[test]
    fn test_list_unknown_source() {
        let (_dir, store) = store();
        assert!(store.list_for_source("nowhere/page.html").unwrap().is_empty());
    }

    #[test]
    fn test_delete_twice_is_ok() {
        let (_dir, store) = store();
        store.write("page.html#a", "text").unwrap();
        let found = store.list_for_source("page.html").unwrap();
        store.delete(&found[0]).unwrap();
        assert!(!found[0].path.exists());
        store.delete(&found[0]).unwrap();
    }
}
