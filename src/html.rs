//! Structural queries over generated documentation pages.
//!
//! The indexing engine only needs a narrow view of a page: the canonical
//! content root (`div#main`), its direct `div[id]` section children, the
//! symbol-header headings that carry title tokens, and paragraph text. The
//! parser recovers from arbitrary markup, so "malformed" here only ever
//! means "no content root" (e.g. a hand-written page mixed into the build).

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Canonical content root of a documentation page
static CONTENT_ROOT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#main").expect("BUG: hardcoded CSS selector 'div#main' is invalid")
});

/// Heading code spans inside a section's canonical symbol header; their
/// tokens are indexed with priority.
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("ul.base_symbol_header > li > h3 > span > code")
        .expect("BUG: hardcoded title selector is invalid")
});

/// Body text carriers within a section
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p").expect("BUG: hardcoded CSS selector 'p' is invalid")
});

/// A parsed documentation page
pub struct Page {
    html: Html,
}

impl Page {
    /// Parse page markup. html5ever recovers from broken markup, so this
    /// never fails; pages without a content root are rejected later.
    pub fn parse(contents: &str) -> Self {
        Self {
            html: Html::parse_document(contents),
        }
    }

    /// Locate the canonical content root: the document root itself when it
    /// carries `id="main"`, otherwise the first `div#main` descendant.
    pub fn content_root(&self) -> Option<ElementRef<'_>> {
        let root = self.html.root_element();
        if root.value().attr("id") == Some("main") {
            return Some(root);
        }
        self.html.select(&CONTENT_ROOT_SELECTOR).next()
    }
}

/// Top-level sections of the content root: direct `div` children carrying
/// an `id` attribute.
pub fn sections(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    root.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "div" && el.value().attr("id").is_some())
        .collect()
}

/// Identifier of a section element
pub fn section_id<'a>(section: ElementRef<'a>) -> Option<&'a str> {
    section.value().attr("id").map(str::trim)
}

/// Title elements of a section, in document order
pub fn title_elements(section: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    section.select(&TITLE_SELECTOR).collect()
}

/// Body text elements of a section, in document order
pub fn body_elements(section: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    section.select(&BODY_SELECTOR).collect()
}

/// Concatenated text content of an element
pub fn text(element: ElementRef<'_>) -> String {
    element.text().collect()
}
