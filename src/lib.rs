//! A predictive text dictionary in the style of the T9 phone keypads.
//!
//! Words are stored in a trie whose links are keypad digits, so that all
//! the words typed with the same keys are found in the same node.
//! The trie is written to the disk and searched there directly,
//! one node at a time, without loading the whole dictionary in memory.

pub mod codec;
pub mod error;
pub mod keys;
pub mod store;
pub mod trie;
pub mod wordlist;

use std::fmt;
use std::io::Write;

pub use error::{Error, Result};
pub use keys::{digit_of, path_of, KeyDigit};
pub use store::DictionaryStore;
pub use trie::{TrieBuilder, TrieNode};

/// How the words of a lookup relate to the typed digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The words are typed with exactly the given digits.
    Exact,
    /// No word ends on the typed digits, the words are
    /// the first ones found further down the trie (they are longer).
    Lookahead,
    /// The typed digits lead nowhere, the words are the last ones
    /// found on the way (they are shorter).
    Lookbehind,
    /// A punctuation key was typed where no word continues:
    /// the words found so far are kept, as the word is considered finished.
    Punctuation,
    /// Nothing matches.
    Miss,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Lookahead => "lookahead",
            MatchKind::Lookbehind => "lookbehind",
            MatchKind::Punctuation => "punctuation",
            MatchKind::Miss => "miss",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub kind: MatchKind,
    /// Number of digits leading to the node of the words,
    /// so the length of the digit path of each word.
    pub depth: usize,
    /// The candidates, in the order they were added to the dictionary.
    pub words: Vec<String>,
}

impl Lookup {
    pub fn miss() -> Self {
        Lookup {
            kind: MatchKind::Miss,
            depth: 0,
            words: Vec::new(),
        }
    }
}

/// Find the candidate words for a sequence of typed keys.
///
/// Searching needs to move inside the dictionary file,
/// hence the mutable borrow even if nothing is modified.
pub trait Search {
    /// Search the words for the given digits, falling back
    /// to longer or shorter words when no word matches exactly.
    fn lookup(&mut self, digits: &[KeyDigit]) -> Result<Lookup>;

    /// Get only the candidate words of a lookup.
    fn getwords(&mut self, digits: &[KeyDigit]) -> Result<Vec<String>> {
        self.lookup(digits).map(|lookup| lookup.words)
    }
}

/// Get information about a dictionary
/// for easy visualisation and debugging.
///
/// All the values are computed by going through all the nodes
/// reachable from the root.
pub trait Information: Search {
    /// Get the number of words present in the structure.
    fn words(&mut self) -> Result<usize>;

    /// Get the number of nodes used to represent all the words.
    fn nodes(&mut self) -> Result<usize>;

    /// Get the height of the trie, so the length of the longest digit path plus one.
    fn height(&mut self) -> Result<usize>;

    /// Display the trie in the graphviz format.
    fn graph<W: Write>(&mut self, out: &mut W) -> Result<()>;
}
