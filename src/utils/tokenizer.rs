use crate::utils::stopwords::Stopwords;
use regex::{Matches, Regex};
use std::sync::LazyLock;

/// Maximum token length to index. Longer matches are almost always
/// base64 blobs or other non-searchable noise, and every indexed token
/// becomes an output file name, which must stay within filesystem name
/// limits.
const MAX_TOKEN_LENGTH: usize = 128;

/// Token grammar: identifier-like, dot-qualified names (`Foo.bar_baz`).
/// A token never starts or ends with a dot and is at least two
/// characters long by construction.
static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_.]*[A-Za-z0-9_]")
        .expect("BUG: hardcoded token regex is invalid")
});

/// One step of the tokenizer stream.
///
/// `Separator` carries text that only matters for fragment reconstruction:
/// runs of non-token characters (verbatim) and stopword tokens (token plus
/// a trailing space). `Token` carries an indexable token together with its
/// reconstruction text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    Separator(String),
    Token { value: String, text: String },
}

impl TokenEvent {
    /// Text contributed to the reconstructed fragment
    pub fn text(&self) -> &str {
        match self {
            TokenEvent::Separator(text) => text,
            TokenEvent::Token { text, .. } => text,
        }
    }

    /// Indexable token value, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            TokenEvent::Separator(_) => None,
            TokenEvent::Token { value, .. } => Some(value),
        }
    }
}

/// Lazy tokenizer over one block of rendered text.
///
/// Separator runs pass through verbatim and every token carries its own
/// trailing space, so concatenating [`TokenEvent::text`] over the stream
/// reconstructs a readable fragment of the input.
pub struct Tokenizer<'a> {
    input: &'a str,
    stop_words: &'a Stopwords,
    matches: Matches<'static, 'a>,
    pos: usize,
    pending: Option<TokenEvent>,
    done: bool,
}

/// Tokenize a block of rendered text against a stopword set
pub fn tokenize<'a>(input: &'a str, stop_words: &'a Stopwords) -> Tokenizer<'a> {
    Tokenizer {
        input,
        stop_words,
        matches: TOKEN_REGEX.find_iter(input),
        pos: 0,
        pending: None,
        done: false,
    }
}

impl<'a> Tokenizer<'a> {
    fn classify(&self, token: &str) -> TokenEvent {
        let text = format!("{} ", token);
        if token.len() > MAX_TOKEN_LENGTH || self.stop_words.contains(token) {
            TokenEvent::Separator(text)
        } else {
            TokenEvent::Token {
                value: token.to_string(),
                text,
            }
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = TokenEvent;

    fn next(&mut self) -> Option<TokenEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        if self.done {
            return None;
        }

        match self.matches.next() {
            Some(m) => {
                let event = self.classify(m.as_str());
                let gap = &self.input[self.pos..m.start()];
                self.pos = m.end();
                if gap.is_empty() {
                    Some(event)
                } else {
                    self.pending = Some(event);
                    Some(TokenEvent::Separator(gap.to_string()))
                }
            }
            None => {
                self.done = true;
                if self.pos < self.input.len() {
                    let rest = &self.input[self.pos..];
                    self.pos = self.input.len();
                    Some(TokenEvent::Separator(rest.to_string()))
                } else {
                    None
                }
            }
        }
    }
}
