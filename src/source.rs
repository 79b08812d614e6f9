//! Rendered source text and its token index.
//!
//! A [`Source`] owns one class's rendered text together with the
//! [`SourceIndex`] built from it; the pair is produced together and nothing
//! mutates either afterwards, so sources can be shared across threads behind
//! an `Arc` without locking.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::entry::{Entry, EntryReference};

/// Half-open character span `[start, end)` into one rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Per-class mapping of entries and references to token spans.
///
/// Built once while indexing a render and read-only afterwards. A declaration
/// absent from this class's text (declared elsewhere, or synthetic) simply
/// has no row; a reference with no occurrences yields an empty slice.
#[derive(Debug, Default)]
pub struct SourceIndex {
    declarations: HashMap<Entry, Token>,
    references: HashMap<EntryReference, Vec<Token>>,
    /// All tokens with the entry each one denotes, sorted by span start,
    /// for position lookups.
    spans: Vec<(Token, Entry)>,
}

impl SourceIndex {
    pub(crate) fn add_declaration(&mut self, entry: Entry, token: Token) {
        self.spans.push((token, entry.clone()));
        self.declarations.insert(entry, token);
    }

    pub(crate) fn add_reference(&mut self, reference: EntryReference, token: Token) {
        self.spans.push((token, reference.target.clone()));
        self.references.entry(reference).or_default().push(token);
    }

    pub(crate) fn seal(&mut self) {
        self.spans.sort_by_key(|(token, _)| (token.start, token.end));
        for tokens in self.references.values_mut() {
            tokens.sort();
        }
    }

    /// The unique span where `entry` is declared in this class's text.
    pub fn declaration_token(&self, entry: &Entry) -> Option<Token> {
        self.declarations.get(entry).copied()
    }

    /// All spans where `reference.target` is mentioned from within
    /// `reference.context`, in textual order.
    pub fn reference_tokens(&self, reference: &EntryReference) -> &[Token] {
        self.references
            .get(reference)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn declarations(&self) -> impl Iterator<Item = (&Entry, Token)> {
        self.declarations.iter().map(|(e, t)| (e, *t))
    }

    pub fn references(&self) -> impl Iterator<Item = (&EntryReference, &[Token])> {
        self.references.iter().map(|(r, t)| (r, t.as_slice()))
    }

    /// The entry whose token covers `offset`, if any. Relies on tokens never
    /// overlapping within one render.
    pub fn entry_at(&self, offset: usize) -> Option<&Entry> {
        let after = self
            .spans
            .partition_point(|(token, _)| token.start <= offset);
        let (token, entry) = self.spans[..after].last()?;
        token.contains(offset).then_some(entry)
    }

    pub fn token_count(&self) -> usize {
        self.spans.len()
    }
}

/// One class's rendered text plus its index.
#[derive(Debug)]
pub struct Source {
    text: String,
    index: SourceIndex,
    content_hash: String,
}

impl Source {
    pub(crate) fn new(text: String, mut index: SourceIndex) -> Self {
        index.seal();
        let content_hash = hash_content(&text);
        Self {
            text,
            index,
            content_hash,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn index(&self) -> &SourceIndex {
        &self.index
    }

    /// Hex sha256 of the rendered text; identical bytes and mapping state
    /// always hash identically.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// The substring a token covers.
    pub fn token_text(&self, token: Token) -> &str {
        &self.text[token.start..token.end]
    }
}

pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
