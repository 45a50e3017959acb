//! Errors raised while building, reading or mutating a dictionary.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The file doesn't follow the dictionary format:
    /// bad magic, truncated record or an offset pointing outside the records.
    #[error("corrupt dictionary: {0}")]
    CorruptDictionary(String),

    /// The word is already stored at its digit path.
    #[error("word already in dictionary: {0:?}")]
    DuplicateWord(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A key sequence contained something other than 0-9.
    #[error("invalid key digit {0:?}")]
    InvalidDigit(char),

    /// The word can't be stored in a record (empty or multi-line).
    #[error("invalid word {0:?}")]
    InvalidWord(String),

    #[error("invalid dictionary metadata: {0}")]
    InvalidMetadata(String),

    /// A node record can only hold `i16::MAX` words.
    #[error("too many words in a single node ({0})")]
    NodeFull(usize),

    /// Child offsets are stored as signed 32 bits values.
    #[error("record offset {0} doesn't fit in the dictionary format")]
    OffsetOverflow(u64),
}

impl Error {
    /// Map a read failure: running out of bytes in the middle
    /// of a record means the file is truncated, not that the disk failed.
    pub(crate) fn from_read(error: io::Error, what: &str) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Error::CorruptDictionary(format!("truncated {}", what))
        } else {
            Error::Io(error)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
