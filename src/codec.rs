//! Binary format of a dictionary file.
//!
//! ```text
//! "PY9DICT:"          8 bytes magic
//! word count          u32, big endian
//! root offset         u32, big endian
//! language '\n'
//! comment '\n'
//! node records...
//! ```
//!
//! A node record is made of:
//! - a u16 mask of the present children, bit `1 << digit` set for each child,
//! - the offset of each present child (i32, big endian) in ascending digit order,
//! - the number of words of the node (i16, so never above `i16::MAX`),
//! - the words, each one followed by '\n'.
//!
//! Children are always written before their parent, so an offset always
//! points backward to a record that is complete. It allows to read a single
//! node without loading the rest of the file, and to add a word by appending
//! the modified nodes at the end of the file without touching the old ones.

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::keys::KeyDigit;
use crate::trie::TrieNode;
use crate::{Error, Result};

/// Magic bytes at the start of every dictionary file.
pub const MAGIC: [u8; 8] = *b"PY9DICT:";

/// Size of the fixed part of the header: magic, word count and root offset.
pub const HEADER_SIZE: u64 = 16;

/// Where the word count is stored in the header.
const COUNTERS_OFFSET: u64 = 8;

/// Smallest possible record: an empty mask and no words.
const MIN_RECORD_SIZE: u64 = 4;

/// The header of a dictionary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Number of words in all the nodes reachable from the root.
    pub word_count: u32,
    /// Offset of the record of the root node.
    pub root_offset: u32,
    /// Name of the language of the words.
    pub language: String,
    /// Free text about the dictionary.
    pub comment: String,
}

impl Header {
    /// Create the header of an empty dictionary.
    /// The language and comment are stored on their own line, so they can't contain a new line.
    pub fn new(language: &str, comment: &str) -> Result<Self> {
        for (name, value) in [("language", language), ("comment", comment)] {
            if value.contains('\n') {
                return Err(Error::InvalidMetadata(format!(
                    "{} contains a new line: {:?}",
                    name, value
                )));
            }
        }

        Ok(Header {
            word_count: 0,
            root_offset: 0,
            language: language.into(),
            comment: comment.into(),
        })
    }

    /// Offset of the first node record, just after the header.
    pub fn records_offset(&self) -> u64 {
        HEADER_SIZE + self.language.len() as u64 + 1 + self.comment.len() as u64 + 1
    }
}

/// Which children of a node are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildMask(u16);

impl ChildMask {
    /// Read a mask from the file, rejecting bits that aren't a digit.
    pub fn from_bits(bits: u16) -> Result<Self> {
        if bits >> KeyDigit::COUNT != 0 {
            Err(Error::CorruptDictionary(format!("invalid children mask {:#06x}", bits)))
        } else {
            Ok(ChildMask(bits))
        }
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, digit: KeyDigit) -> bool {
        self.0 & (1 << digit.get()) != 0
    }

    pub fn insert(&mut self, digit: KeyDigit) {
        self.0 |= 1 << digit.get();
    }

    /// Number of present children.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Present digits, in ascending order.
    pub fn digits(self) -> impl Iterator<Item = KeyDigit> {
        KeyDigit::all().filter(move |digit| self.contains(*digit))
    }
}

/// A full node record: what is needed to write a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRecord {
    /// Offset of the record of each child, indexed by digit.
    pub children: [Option<u32>; KeyDigit::COUNT],
    pub words: Vec<String>,
}

impl NodeRecord {
    pub fn child(&self, digit: KeyDigit) -> Option<u32> {
        self.children[digit.index()]
    }

    /// Serialize the record.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_record(&self.children, &self.words)
    }
}

/// Most words a single node can hold.
pub const MAX_NODE_WORDS: usize = i16::MAX as usize;

/// Serialize a node record from its children offsets and its words.
pub fn encode_record(
    children: &[Option<u32>; KeyDigit::COUNT],
    words: &[String],
) -> Result<Vec<u8>> {
    if words.len() > MAX_NODE_WORDS {
        return Err(Error::NodeFull(words.len()));
    }
    let word_count = words.len() as u16;

    let mut mask = ChildMask::default();
    let mut offsets = Vec::with_capacity(KeyDigit::COUNT);
    for digit in KeyDigit::all() {
        if let Some(offset) = children[digit.index()] {
            mask.insert(digit);
            offsets.push(to_child_offset(u64::from(offset))?);
        }
    }

    let words_len: usize = words.iter().map(|word| word.len() + 1).sum();
    let mut buffer = Vec::with_capacity(4 + offsets.len() * 4 + words_len);

    buffer.extend_from_slice(&mask.bits().to_be_bytes());
    for offset in offsets {
        buffer.extend_from_slice(&offset.to_be_bytes());
    }
    buffer.extend_from_slice(&word_count.to_be_bytes());
    for word in words {
        buffer.extend_from_slice(word.as_bytes());
        buffer.push(b'\n');
    }

    Ok(buffer)
}

/// Check that a position in the file can be referenced by a parent record.
fn to_child_offset(position: u64) -> Result<i32> {
    i32::try_from(position).map_err(|_| Error::OffsetOverflow(position))
}

/// Get the offset at which a record written at the given position will be referenced.
pub fn record_offset(position: u64) -> Result<u32> {
    // Stored as unsigned in the header but signed in the parents.
    to_child_offset(position).map(|offset| offset as u32)
}

/// A node record whose fixed part has been read.
/// The words are only read on demand, with `read_words`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView {
    offset: u32,
    children: [Option<u32>; KeyDigit::COUNT],
    word_count: u16,
    /// Where the first word starts.
    words_offset: u64,
}

impl NodeView {
    /// Offset of the record in the file.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn child(&self, digit: KeyDigit) -> Option<u32> {
        self.children[digit.index()]
    }

    /// Present children, in ascending digit order.
    pub fn children(&self) -> impl Iterator<Item = (KeyDigit, u32)> + '_ {
        KeyDigit::all().filter_map(move |digit| self.child(digit).map(|offset| (digit, offset)))
    }

    /// The child with the smallest digit.
    pub fn first_child(&self) -> Option<(KeyDigit, u32)> {
        self.children().next()
    }

    pub fn word_count(&self) -> usize {
        self.word_count as usize
    }

    pub fn has_words(&self) -> bool {
        self.word_count != 0
    }

    /// Read the words of the node, in their stored order.
    pub fn read_words<S: Read + Seek>(&self, source: &mut S) -> Result<Vec<String>> {
        if !self.has_words() {
            return Ok(Vec::new());
        }

        source.seek(SeekFrom::Start(self.words_offset))?;
        let mut reader = BufReader::new(source);

        let mut words = Vec::with_capacity(self.word_count());
        let mut line = Vec::new();
        for _ in 0..self.word_count {
            line.clear();
            reader.read_until(b'\n', &mut line)?;

            if line.pop() != Some(b'\n') {
                return Err(Error::CorruptDictionary(format!(
                    "truncated words in record at {}",
                    self.offset
                )));
            }

            let word = String::from_utf8(line.clone()).map_err(|error| {
                Error::CorruptDictionary(format!(
                    "invalid word in record at {} ({})",
                    self.offset, error
                ))
            })?;
            words.push(word);
        }

        Ok(words)
    }

    /// Read the words and get the full record, to rewrite it.
    pub fn into_record<S: Read + Seek>(self, source: &mut S) -> Result<NodeRecord> {
        Ok(NodeRecord {
            children: self.children,
            words: self.read_words(source)?,
        })
    }
}

fn read_exact<S: Read>(source: &mut S, buffer: &mut [u8], what: &str) -> Result<()> {
    source.read_exact(buffer).map_err(|error| Error::from_read(error, what))
}

fn read_u16<S: Read>(source: &mut S, what: &str) -> Result<u16> {
    let mut bytes = [0; 2];
    read_exact(source, &mut bytes, what)?;
    Ok(u16::from_be_bytes(bytes))
}

fn read_u32<S: Read>(source: &mut S, what: &str) -> Result<u32> {
    let mut bytes = [0; 4];
    read_exact(source, &mut bytes, what)?;
    Ok(u32::from_be_bytes(bytes))
}

/// Read the fixed part of a single node record.
/// Children are not read, only their offsets.
pub fn read_node_at<S: Read + Seek>(source: &mut S, offset: u32) -> Result<NodeView> {
    let len = source.seek(SeekFrom::End(0))?;
    let start = u64::from(offset);

    if start < HEADER_SIZE || start + MIN_RECORD_SIZE > len {
        return Err(Error::CorruptDictionary(format!(
            "record offset {} out of range (file size {})",
            offset, len
        )));
    }

    source.seek(SeekFrom::Start(start))?;
    let mask = ChildMask::from_bits(read_u16(source, "record mask")?)?;

    let mut children = [None; KeyDigit::COUNT];
    for digit in mask.digits() {
        let child = read_u32(source, "record children")? as i32;

        // Children are written before their parent.
        if child < HEADER_SIZE as i32 || child >= offset as i32 {
            return Err(Error::CorruptDictionary(format!(
                "record at {} has an invalid child offset {} for digit {}",
                offset, child, digit
            )));
        }

        children[digit.index()] = Some(child as u32);
    }

    let word_count = read_u16(source, "record word count")?;
    if usize::from(word_count) > MAX_NODE_WORDS {
        return Err(Error::CorruptDictionary(format!(
            "record at {} has a negative word count",
            offset
        )));
    }

    Ok(NodeView {
        offset,
        children,
        word_count,
        words_offset: start + 2 + 4 * mask.len() as u64 + 2,
    })
}

/// Read the header at the start of the file.
pub fn read_header<S: Read + Seek>(source: &mut S) -> Result<Header> {
    let len = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(0))?;

    let mut magic = [0; 8];
    read_exact(source, &mut magic, "header")?;
    if magic != MAGIC {
        return Err(Error::CorruptDictionary(format!(
            "invalid magic {:?}",
            String::from_utf8_lossy(&magic)
        )));
    }

    let word_count = read_u32(source, "header")?;
    let root_offset = read_u32(source, "header")?;

    let mut reader = BufReader::new(source);
    let language = read_line(&mut reader, "language")?;
    let comment = read_line(&mut reader, "comment")?;

    let header = Header {
        word_count,
        root_offset,
        language,
        comment,
    };

    if u64::from(root_offset) < header.records_offset() || u64::from(root_offset) >= len {
        return Err(Error::CorruptDictionary(format!(
            "root offset {} out of range (file size {})",
            root_offset, len
        )));
    }

    Ok(header)
}

fn read_line<R: BufRead>(reader: &mut R, what: &str) -> Result<String> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;

    if line.pop() != Some(b'\n') {
        return Err(Error::CorruptDictionary(format!("truncated header {}", what)));
    }

    String::from_utf8(line)
        .map_err(|error| Error::CorruptDictionary(format!("invalid header {} ({})", what, error)))
}

/// Write the header at the current position, which must be the start of the file.
/// When the word count and root offset are not known yet, write placeholders
/// and fix them with `patch_header` once the records are written.
pub fn write_header<W: Write>(sink: &mut W, header: &Header) -> Result<()> {
    sink.write_all(&MAGIC)?;
    sink.write_all(&header.word_count.to_be_bytes())?;
    sink.write_all(&header.root_offset.to_be_bytes())?;
    sink.write_all(header.language.as_bytes())?;
    sink.write_all(b"\n")?;
    sink.write_all(header.comment.as_bytes())?;
    sink.write_all(b"\n")?;

    Ok(())
}

/// Overwrite the word count and root offset of an already written header.
pub fn patch_header<W: Write + Seek>(
    sink: &mut W,
    word_count: u32,
    root_offset: u32,
) -> Result<()> {
    let mut counters = [0; 8];
    counters[..4].copy_from_slice(&word_count.to_be_bytes());
    counters[4..].copy_from_slice(&root_offset.to_be_bytes());

    sink.seek(SeekFrom::Start(COUNTERS_OFFSET))?;
    sink.write_all(&counters)?;

    Ok(())
}

/// Write all the nodes of the trie at the current position,
/// each child before its parent, and return the offset of the root record.
pub fn write_tree<W: Write + Seek>(root: &TrieNode, sink: &mut W) -> Result<u32> {
    let mut position = sink.stream_position()?;
    write_node(root, sink, &mut position)
}

fn write_node<W: Write>(node: &TrieNode, sink: &mut W, position: &mut u64) -> Result<u32> {
    let mut children = [None; KeyDigit::COUNT];
    for (digit, child) in node.present_children() {
        children[digit.index()] = Some(write_node(child, sink, position)?);
    }

    let offset = record_offset(*position)?;
    let record = encode_record(&children, &node.words)?;

    sink.write_all(&record)?;
    *position += record.len() as u64;

    Ok(offset)
}

/// Write a complete dictionary file for the given trie, starting at the beginning of the sink.
pub fn write_dictionary<W: Write + Seek>(
    sink: &mut W,
    root: &TrieNode,
    language: &str,
    comment: &str,
) -> Result<Header> {
    let mut header = Header::new(language, comment)?;

    sink.seek(SeekFrom::Start(0))?;
    write_header(sink, &header)?;

    let word_count = root.total_words();
    header.word_count = u32::try_from(word_count)
        .map_err(|_| Error::InvalidMetadata(format!("too many words ({})", word_count)))?;
    header.root_offset = write_tree(root, sink)?;

    patch_header(sink, header.word_count, header.root_offset)?;
    sink.flush()?;

    debug!(words = header.word_count, root = header.root_offset, "dictionary written");

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::trie::TrieBuilder;

    fn digit(value: u8) -> KeyDigit {
        KeyDigit::new(value).unwrap()
    }

    fn dictionary(words: &[&str]) -> Cursor<Vec<u8>> {
        let root = TrieBuilder::build(words).unwrap();
        let mut file = Cursor::new(Vec::new());
        write_dictionary(&mut file, &root, "English", "test").unwrap();
        file
    }

    #[test]
    fn header_layout() {
        let file = dictionary(&["a"]);
        let bytes = file.get_ref();

        assert_eq!(b"PY9DICT:", &bytes[..8]);
        // One word.
        assert_eq!([0, 0, 0, 1], bytes[8..12]);
        assert_eq!(b"English\ntest\n", &bytes[16..29]);

        // Records: the "a" node then the root.
        let a = &bytes[29..35];
        assert_eq!([0, 0, 0, 1, b'a', b'\n'], a);

        let root = &bytes[35..];
        assert_eq!([0, 0b100, 0, 0, 0, 29, 0, 0], root);
        assert_eq!([0, 0, 0, 35], bytes[12..16]);
    }

    #[test]
    fn record_layout() {
        let mut record = NodeRecord::default();
        record.children[9] = Some(0x0102_0304);
        record.children[2] = Some(20);
        record.words = vec!["hé".into(), "ho".into()];

        // Digits 2 and 9, then their offsets in ascending digit order.
        let mut expected = vec![0b10, 0b100, 0, 0, 0, 20, 1, 2, 3, 4];
        expected.extend_from_slice(&[0, 2]);
        expected.extend_from_slice("hé\nho\n".as_bytes());

        assert_eq!(expected, record.encode().unwrap());
    }

    #[test]
    fn read_back() {
        let mut file = dictionary(&["go", "in", "good", "home"]);
        let header = read_header(&mut file).unwrap();

        assert_eq!(4, header.word_count);
        assert_eq!("English", header.language);
        assert_eq!("test", header.comment);
        assert_eq!(29, header.records_offset());

        let root = read_node_at(&mut file, header.root_offset).unwrap();
        assert!(!root.has_words());
        assert_eq!(vec![digit(4)], root.children().map(|(d, _)| d).collect::<Vec<_>>());

        let g = read_node_at(&mut file, root.child(digit(4)).unwrap()).unwrap();
        let go = read_node_at(&mut file, g.child(digit(6)).unwrap()).unwrap();
        assert_eq!(vec!["go".to_string(), "in".into()], go.read_words(&mut file).unwrap());

        let goo = read_node_at(&mut file, go.child(digit(6)).unwrap()).unwrap();
        let good = read_node_at(&mut file, goo.child(digit(3)).unwrap()).unwrap();
        assert_eq!(2, good.word_count());
        assert!(good.first_child().is_none());

        let record = good.into_record(&mut file).unwrap();
        assert_eq!(vec!["good".to_string(), "home".into()], record.words);
    }

    #[test]
    fn empty_dictionary() {
        let mut file = dictionary(&[]);
        let header = read_header(&mut file).unwrap();

        assert_eq!(0, header.word_count);
        let root = read_node_at(&mut file, header.root_offset).unwrap();
        assert!(root.first_child().is_none());
        assert!(root.read_words(&mut file).unwrap().is_empty());
    }

    #[test]
    fn bad_magic() {
        let mut file = dictionary(&["a"]);
        file.get_mut()[0] = b'X';

        assert!(matches!(read_header(&mut file), Err(Error::CorruptDictionary(_))));
        let mut short = Cursor::new(b"PY9".to_vec());
        assert!(matches!(read_header(&mut short), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn truncated() {
        let bytes = dictionary(&["hello"]).into_inner();

        // "hello" is the deepest node, so the first record: cut inside its word.
        let mut file = Cursor::new(bytes[..37].to_vec());
        let hello = read_node_at(&mut file, 29).unwrap();
        assert_eq!(1, hello.word_count());
        assert!(matches!(hello.read_words(&mut file), Err(Error::CorruptDictionary(_))));

        // Cut inside the children offsets of its parent.
        let mut file = Cursor::new(bytes[..43].to_vec());
        assert!(matches!(read_node_at(&mut file, 39), Err(Error::CorruptDictionary(_))));

        // Cut before the end of the first record, and the root is gone.
        let mut file = Cursor::new(bytes[..32].to_vec());
        assert!(matches!(read_node_at(&mut file, 29), Err(Error::CorruptDictionary(_))));
        assert!(matches!(read_node_at(&mut file, 3), Err(Error::CorruptDictionary(_))));
        assert!(matches!(read_header(&mut file), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn forward_reference() {
        let mut file = dictionary(&["a"]);
        let header = read_header(&mut file).unwrap();

        // Make the root point to itself.
        let offset = header.root_offset as usize;
        file.get_mut()[offset + 2..offset + 6].copy_from_slice(&header.root_offset.to_be_bytes());

        let root = read_node_at(&mut file, header.root_offset);
        assert!(matches!(root, Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn invalid_mask() {
        let mut file = Cursor::new(Vec::new());
        let mut header = Header::new("", "").unwrap();
        header.root_offset = 18;
        write_header(&mut file, &header).unwrap();
        file.write_all(&[0x80, 0, 0, 0]).unwrap();

        assert!(matches!(read_node_at(&mut file, 18), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn node_full() {
        let children = [None; KeyDigit::COUNT];
        let mut words = vec!["a".to_string(); MAX_NODE_WORDS];

        let bytes = encode_record(&children, &words).unwrap();
        assert_eq!([0x7f, 0xff], bytes[2..4]);

        words.push("a".into());
        assert!(matches!(encode_record(&children, &words), Err(Error::NodeFull(32768))));
    }

    #[test]
    fn negative_word_count() {
        let mut file = Cursor::new(Vec::new());
        let mut header = Header::new("", "").unwrap();
        header.root_offset = 18;
        write_header(&mut file, &header).unwrap();
        file.write_all(&[0, 0, 0x80, 0]).unwrap();

        assert!(matches!(read_node_at(&mut file, 18), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn patch() {
        let mut file = Cursor::new(Vec::new());
        write_header(&mut file, &Header::new("fr", "").unwrap()).unwrap();
        file.write_all(&[0, 0, 0, 0]).unwrap();
        patch_header(&mut file, 7, 20).unwrap();

        let header = read_header(&mut file).unwrap();
        assert_eq!(7, header.word_count);
        assert_eq!(20, header.root_offset);
        assert_eq!("fr", header.language);
        assert_eq!("", header.comment);
    }

    #[test]
    fn invalid_metadata() {
        assert!(matches!(Header::new("en\ngb", ""), Err(Error::InvalidMetadata(_))));
        assert!(matches!(Header::new("en", "a\nb"), Err(Error::InvalidMetadata(_))));
    }

    #[test]
    fn offset_overflow() {
        assert!(record_offset(i32::MAX as u64).is_ok());
        assert!(matches!(record_offset(i32::MAX as u64 + 1), Err(Error::OffsetOverflow(_))));
    }
}
