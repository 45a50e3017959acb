//! In-memory trie used to build a dictionary before writing it to the disk.
//!
//! Each link of the trie is a key digit, so all the words typed with
//! the same keys end up in the same node. The words of a node keep the order
//! in which they were added: with a word list sorted by frequency,
//! the first word of a node is the most likely one.

use tracing::debug;

use crate::keys::{path_of, KeyDigit};
use crate::{Error, Result};

/// A node of the in-memory trie.
/// A node can both hold words and have children
/// (a word can be the prefix of another one, like "can" and "candy").
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrieNode {
    /// The children of the node, indexed by the digit leading to them.
    pub children: [Option<Box<TrieNode>>; KeyDigit::COUNT],

    /// Words whose digit path ends exactly on this node.
    pub words: Vec<String>,
}

impl TrieNode {
    pub fn new() -> Self {
        TrieNode::default()
    }

    pub fn child(&self, digit: KeyDigit) -> Option<&TrieNode> {
        self.children[digit.index()].as_deref()
    }

    /// Get the child for the given digit, creating it if it doesn't exist yet.
    pub fn child_or_insert(&mut self, digit: KeyDigit) -> &mut TrieNode {
        self.children[digit.index()].get_or_insert_with(Default::default)
    }

    /// Iterate over the present children in ascending digit order.
    pub fn present_children(&self) -> impl Iterator<Item = (KeyDigit, &TrieNode)> {
        KeyDigit::all().filter_map(move |digit| self.child(digit).map(|child| (digit, child)))
    }

    /// Get the node at the end of the given path if it exists.
    pub fn find(&self, path: &[KeyDigit]) -> Option<&TrieNode> {
        path.iter().try_fold(self, |node, digit| node.child(*digit))
    }

    /// Number of words stored in this node and all its descendants.
    pub fn total_words(&self) -> usize {
        self.words.len()
            + self
                .present_children()
                .map(|(_, child)| child.total_words())
                .sum::<usize>()
    }
}

/// Check that the word can be written in a node record,
/// where words are separated by new lines.
pub(crate) fn check_word(word: &str) -> Result<()> {
    if word.is_empty() || word.contains('\n') {
        Err(Error::InvalidWord(word.into()))
    } else {
        Ok(())
    }
}

/// Build a trie from an ordered list of words.
///
/// Words are not deduplicated: the same word added twice is stored twice,
/// in the order it was added.
#[derive(Debug)]
pub struct TrieBuilder {
    root: TrieNode,
    words: usize,
    nodes: usize,
}

impl TrieBuilder {
    pub fn new() -> Self {
        TrieBuilder {
            root: TrieNode::new(),
            words: 0,
            nodes: 1,
        }
    }

    /// Build the trie of all the given words, keeping their order.
    pub fn build<I, S>(words: I) -> Result<TrieNode>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = TrieBuilder::new();
        for word in words {
            builder.add(word.as_ref())?;
        }

        Ok(builder.finish())
    }

    /// Add a word at the end of the node of its digit path.
    pub fn add(&mut self, word: &str) -> Result<()> {
        check_word(word)?;

        let mut node = &mut self.root;
        for digit in path_of(word) {
            if node.child(digit).is_none() {
                self.nodes += 1;
            }

            node = node.child_or_insert(digit);
        }

        node.words.push(word.into());
        self.words += 1;

        Ok(())
    }

    /// How many words have been added.
    pub fn words(&self) -> usize {
        self.words
    }

    /// How many nodes the trie is made of, root included.
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Get the built trie. No more words can be added.
    pub fn finish(self) -> TrieNode {
        debug!(words = self.words, nodes = self.nodes, "trie built");
        self.root
    }
}

impl Default for TrieBuilder {
    fn default() -> Self {
        TrieBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::parse_digits;

    fn words_at<'a>(root: &'a TrieNode, digits: &str) -> Option<&'a [String]> {
        root.find(&parse_digits(digits).unwrap()).map(|node| node.words.as_slice())
    }

    #[test]
    fn group_by_path() {
        let root = TrieBuilder::build(["good", "home", "gone", "hood"]).unwrap();

        let expected = ["good".to_string(), "home".into(), "gone".into(), "hood".into()];
        assert_eq!(Some(&expected[..]), words_at(&root, "4663"));
        assert_eq!(4, root.total_words());
    }

    #[test]
    fn prefix_words() {
        let root = TrieBuilder::build(["can", "candy"]).unwrap();

        let can = root.find(&path_of("can")).unwrap();
        assert_eq!(vec!["can".to_string()], can.words);
        // The node of "can" is also on the way to "candy".
        assert_eq!(1, can.present_children().count());
        assert_eq!(vec!["candy".to_string()], root.find(&path_of("candy")).unwrap().words);
    }

    #[test]
    fn lazy_nodes() {
        let mut builder = TrieBuilder::new();
        assert_eq!(1, builder.nodes());

        builder.add("go").unwrap();
        assert_eq!(3, builder.nodes());

        // Shares the whole "go" path.
        builder.add("good").unwrap();
        assert_eq!(5, builder.nodes());
        assert_eq!(2, builder.words());

        let root = builder.finish();
        assert!(root.child(KeyDigit::new(5).unwrap()).is_none());
        assert!(words_at(&root, "466").unwrap().is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let root = TrieBuilder::build(["in", "go", "in"]).unwrap();

        assert_eq!(Some(&["in".to_string(), "go".into(), "in".into()][..]), words_at(&root, "46"));
    }

    #[test]
    fn space_has_its_own_child() {
        let root = TrieBuilder::build(["a b", "a"]).unwrap();

        assert_eq!(Some(&["a b".to_string()][..]), words_at(&root, "202"));
        assert_eq!(Some(&["a".to_string()][..]), words_at(&root, "2"));
        assert!(root.child(KeyDigit::new(2).unwrap()).unwrap().child(KeyDigit::SPACE).is_some());
    }

    #[test]
    fn invalid_words() {
        let mut builder = TrieBuilder::new();

        assert!(matches!(builder.add(""), Err(Error::InvalidWord(_))));
        assert!(matches!(builder.add("two\nlines"), Err(Error::InvalidWord(_))));
        assert_eq!(0, builder.words());
    }
}
