//! An open dictionary file.
//!
//! Lookups read the nodes one by one from the file, starting from the root.
//! Adding a word never modifies a written node: the node receiving the word
//! and all its ancestors are written again at the end of the file, each new
//! parent pointing to the new child, then the header is updated to point
//! to the new root. The old records are left unreachable in the file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::codec::{self, Header, NodeRecord, NodeView};
use crate::keys::{display_path, path_of, KeyDigit};
use crate::trie::{check_word, TrieNode};
use crate::{Error, Information, Lookup, MatchKind, Result, Search};

/// A dictionary stored in a file (or anything that can be read and seeked).
#[derive(Debug)]
pub struct DictionaryStore<S = File> {
    source: S,
    /// Always reflects what is written in the file.
    header: Header,
}

impl DictionaryStore<File> {
    /// Open a dictionary file for both lookups and insertions.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        DictionaryStore::from_source(file)
    }

    /// Open a dictionary file for lookups only.
    /// Adding a word to it will fail with an I/O error.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        DictionaryStore::from_source(File::open(path.as_ref())?)
    }

    /// Write the dictionary of the given trie to a new file (replacing any existing one)
    /// and open it.
    pub fn create<P: AsRef<Path>>(
        path: P,
        root: &TrieNode,
        language: &str,
        comment: &str,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;

        let mut sink = BufWriter::new(file);
        codec::write_dictionary(&mut sink, root, language, comment)?;
        let file = sink.into_inner().map_err(|error| error.into_error())?;

        DictionaryStore::from_source(file)
    }
}

impl<S: Read + Seek> DictionaryStore<S> {
    /// Use an already open dictionary.
    pub fn from_source(mut source: S) -> Result<Self> {
        let header = codec::read_header(&mut source)?;

        debug!(
            words = header.word_count,
            root = header.root_offset,
            language = %header.language,
            "dictionary opened"
        );

        Ok(DictionaryStore { source, header })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn word_count(&self) -> u32 {
        self.header.word_count
    }

    pub fn root_offset(&self) -> u32 {
        self.header.root_offset
    }

    pub fn language(&self) -> &str {
        &self.header.language
    }

    pub fn comment(&self) -> &str {
        &self.header.comment
    }

    /// Get back the underlying file.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Words can't be removed from a dictionary.
    ///
    /// Nodes are referenced by their offset in the file, so a removal would need
    /// to rewrite the ancestors like an insertion, and leave the old nodes
    /// unused forever as the file is never compacted.
    pub fn delword(&mut self, _word: &str) -> Result<()> {
        Err(Error::UnsupportedOperation("words can't be deleted from a dictionary"))
    }

    fn read_node(&mut self, offset: u32) -> Result<NodeView> {
        // The language and comment lines are not records.
        if u64::from(offset) < self.header.records_offset() {
            return Err(Error::CorruptDictionary(format!(
                "record offset {} points inside the header",
                offset
            )));
        }

        codec::read_node_at(&mut self.source, offset)
    }

    /// Read the whole record, or give an empty one for a node that doesn't exist yet.
    fn read_record(&mut self, offset: Option<u32>) -> Result<NodeRecord> {
        match offset {
            Some(offset) => self.read_node(offset)?.into_record(&mut self.source),
            None => Ok(NodeRecord::default()),
        }
    }

    fn found(&mut self, kind: MatchKind, node: &NodeView, depth: usize) -> Result<Lookup> {
        Ok(Lookup {
            kind,
            depth,
            words: node.read_words(&mut self.source)?,
        })
    }

    /// Use the last node with words seen on the way, if any.
    fn fallback(&mut self, saved: Option<(NodeView, usize)>, kind: MatchKind) -> Result<Lookup> {
        match saved {
            Some((node, depth)) => self.found(kind, &node, depth),
            None => Ok(Lookup::miss()),
        }
    }

    /// Go through all the nodes reachable from the root, with their depth.
    fn visit<F>(&mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&mut Self, &NodeView, usize) -> Result<()>,
    {
        let mut stack = vec![(self.header.root_offset, 0)];

        while let Some((offset, depth)) = stack.pop() {
            let node = self.read_node(offset)?;
            visitor(&mut *self, &node, depth)?;

            // Reversed so that the smallest digit is visited first.
            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|(_, child)| (child, depth + 1)));
        }

        Ok(())
    }
}

impl<S: Read + Write + Seek> DictionaryStore<S> {
    /// Add a word to the dictionary, after the words already typed with the same keys.
    ///
    /// Fails with `DuplicateWord` when the word is already there,
    /// in which case the file is left untouched.
    pub fn addword(&mut self, word: &str) -> Result<()> {
        check_word(word)?;
        let path = path_of(word);

        // Records of all the nodes from the root to the one of the word.
        // Nodes that don't exist yet are empty.
        let mut ancestors = Vec::with_capacity(path.len());
        let mut node = self.read_record(Some(self.header.root_offset))?;
        for digit in &path {
            let child = node.child(*digit);
            ancestors.push(node);
            node = self.read_record(child)?;
        }

        if node.words.iter().any(|existing| existing == word) {
            return Err(Error::DuplicateWord(word.into()));
        }

        let word_count = self
            .header
            .word_count
            .checked_add(1)
            .ok_or_else(|| Error::InvalidMetadata("too many words".into()))?;

        node.words.push(word.into());

        // From the node of the word up to the root, each new record
        // replaces the old one in its parent.
        let mut offset = self.append(&node)?;
        for (ancestor, digit) in ancestors.iter_mut().zip(&path).rev() {
            ancestor.children[digit.index()] = Some(offset);
            offset = self.append(ancestor)?;
        }

        codec::patch_header(&mut self.source, word_count, offset)?;
        self.source.flush()?;

        self.header = codec::read_header(&mut self.source)?;

        debug!(
            word,
            path = %display_path(&path),
            records = path.len() + 1,
            root = offset,
            "word added"
        );

        Ok(())
    }

    /// Write the record at the end of the file and return its offset.
    fn append(&mut self, record: &NodeRecord) -> Result<u32> {
        let bytes = record.encode()?;

        let position = self.source.seek(SeekFrom::End(0))?;
        let offset = codec::record_offset(position)?;
        self.source.write_all(&bytes)?;

        Ok(offset)
    }
}

impl<S: Read + Seek> Search for DictionaryStore<S> {
    fn lookup(&mut self, digits: &[KeyDigit]) -> Result<Lookup> {
        trace!(digits = %display_path(digits), "lookup");

        let mut node = self.read_node(self.header.root_offset)?;
        // Last node with words found on the way and its depth.
        let mut saved = None;

        for (depth, digit) in digits.iter().enumerate() {
            if node.has_words() {
                saved = Some((node, depth));
            }

            match node.child(*digit) {
                Some(child) => node = self.read_node(child)?,
                None if *digit == KeyDigit::PUNCTUATION => {
                    return self.fallback(saved, MatchKind::Punctuation);
                }
                None => return self.fallback(saved, MatchKind::Lookbehind),
            }
        }

        if node.has_words() {
            return self.found(MatchKind::Exact, &node, digits.len());
        }

        // Only a branch: the first words found when going down are the best guess.
        let mut depth = digits.len();
        while let Some((_, child)) = node.first_child() {
            node = self.read_node(child)?;
            depth += 1;

            if node.has_words() {
                return self.found(MatchKind::Lookahead, &node, depth);
            }
        }

        self.fallback(saved, MatchKind::Lookbehind)
    }
}

impl<S: Read + Seek> Information for DictionaryStore<S> {
    fn words(&mut self) -> Result<usize> {
        let mut words = 0;
        self.visit(|_, node, _| {
            words += node.word_count();
            Ok(())
        })?;

        Ok(words)
    }

    fn nodes(&mut self) -> Result<usize> {
        let mut nodes = 0;
        self.visit(|_, _, _| {
            nodes += 1;
            Ok(())
        })?;

        Ok(nodes)
    }

    fn height(&mut self) -> Result<usize> {
        let mut height = 0;
        self.visit(|_, _, depth| {
            height = height.max(depth + 1);
            Ok(())
        })?;

        Ok(height)
    }

    fn graph<W: Write>(&mut self, out: &mut W) -> Result<()> {
        writeln!(out, "digraph G {{")?;

        self.visit(|store, node, _| {
            let words = node.read_words(&mut store.source)?;
            if words.is_empty() {
                writeln!(out, "{} [label=\"\"];", node.offset())?;
            } else {
                writeln!(
                    out,
                    "{} [label={:?}, color=green, style=filled];",
                    node.offset(),
                    words.join("\n")
                )?;
            }

            for (digit, child) in node.children() {
                writeln!(out, "{} -> {} [label=\"{}\"];", node.offset(), child, digit)?;
            }

            Ok(())
        })?;

        writeln!(out, "}}")?;
        Ok(())
    }
}
