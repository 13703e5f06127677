//! Index boundary: the traits the pipeline inserts subterms through, plus an
//! in-memory content-addressed backend.
//!
//! The persistent substitution-tree index lives behind [`IndexHandle`];
//! this crate only ever sees `insert(subterm, locator, path) -> bool`.
//! Connections are ephemeral by contract: the walker acquires a fresh
//! [`IndexConnection`] for every single insertion and drops it immediately,
//! so the backend can bound per-connection lifetime however it likes.
//!
//! [`MemoryIndex`] is the reference backend used by tests and the `hvx` CLI.
//! It keys each subterm by the SHA-256 of its re-serialized markup, so
//! identical subterms from different expressions collapse to one entry with
//! a posting list.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::token::{TokenId, TokenTree};

/// A short-lived session with the index, valid for one insertion.
pub trait IndexConnection {
    /// Insert one subterm. Returns `true` if the index accepted it; a
    /// `false` is counted as not-indexed and never aborts the traversal.
    fn insert(&mut self, tree: &TokenTree, subterm: TokenId, locator: &str, path: &str) -> bool;
}

/// Factory for ephemeral index connections.
pub trait IndexHandle: Send + Sync {
    /// Acquire a fresh connection. Callers drop it right after one insert.
    fn connect(&self) -> Result<Box<dyn IndexConnection + '_>>;
}

/// One occurrence of a subterm in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Source locator of the owning expression (opaque, often a URL).
    pub locator: String,
    /// Positional path of the subterm within its expression.
    pub path: String,
}

/// In-memory content-addressed index.
pub struct MemoryIndex {
    entries: RwLock<HashMap<String, Vec<Posting>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        MemoryIndex {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Total number of postings (one per successful insertion).
    pub fn subterm_count(&self) -> usize {
        self.entries.read().unwrap().values().map(Vec::len).sum()
    }

    /// Number of distinct subterm contents.
    pub fn distinct_subterms(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Postings recorded for a given subterm markup, in insertion order.
    pub fn postings_for(&self, markup: &str) -> Vec<Posting> {
        self.entries
            .read()
            .unwrap()
            .get(&content_key(markup))
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn content_key(markup: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(markup.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct MemoryConnection<'a> {
    index: &'a MemoryIndex,
}

impl IndexConnection for MemoryConnection<'_> {
    fn insert(&mut self, tree: &TokenTree, subterm: TokenId, locator: &str, path: &str) -> bool {
        let markup = tree.subtree_markup(subterm);
        let key = content_key(&markup);
        self.index
            .entries
            .write()
            .unwrap()
            .entry(key)
            .or_default()
            .push(Posting {
                locator: locator.to_string(),
                path: path.to_string(),
            });
        true
    }
}

impl IndexHandle for MemoryIndex {
    fn connect(&self) -> Result<Box<dyn IndexConnection + '_>> {
        Ok(Box::new(MemoryConnection { index: self }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_subterms_share_one_entry() {
        let index = MemoryIndex::new();
        let tree = TokenTree::with_root("ci", &[]);
        {
            let mut conn = index.connect().unwrap();
            assert!(conn.insert(&tree, tree.root(), "u1", ""));
        }
        {
            let mut conn = index.connect().unwrap();
            assert!(conn.insert(&tree, tree.root(), "u2", "1/2"));
        }
        assert_eq!(index.subterm_count(), 2);
        assert_eq!(index.distinct_subterms(), 1);
        let postings = index.postings_for("<ci/>");
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].locator, "u1");
        assert_eq!(postings[1].path, "1/2");
    }

    #[test]
    fn test_different_content_gets_different_entries() {
        let index = MemoryIndex::new();
        let a = TokenTree::with_root("a", &[]);
        let b = TokenTree::with_root("b", &[]);
        index.connect().unwrap().insert(&a, a.root(), "u", "");
        index.connect().unwrap().insert(&b, b.root(), "u", "");
        assert_eq!(index.distinct_subterms(), 2);
    }
}
