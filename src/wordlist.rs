use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::Path;

use crate::Result;

/// Load a word list file and iterate over its words.
///
/// A word list contains one word per line, the most frequent words first,
/// so that they are proposed first. Empty lines are skipped and
/// the line ending (either "\n" or "\r\n") is not part of the word.
/// Any other line is a word, even if it is only made of spaces.
pub struct WordList<R = BufReader<File>> {
    buffer: R,
}

impl WordList {
    /// Create a word list for the given file.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let file = File::open(filename.as_ref())?;

        Ok(WordList {
            buffer: BufReader::new(file),
        })
    }
}

impl<R: Read> WordList<BufReader<R>> {
    /// Read a word list from anything that can be read.
    pub fn from_reader(reader: R) -> Self {
        WordList {
            buffer: BufReader::new(reader),
        }
    }
}

impl<R: BufRead> IntoIterator for WordList<R> {
    type Item = Result<String>;
    type IntoIter = WordListIterator<R>;

    /// Transform the word list into an iterator.
    fn into_iter(self) -> Self::IntoIter {
        WordListIterator {
            iter: self.buffer.lines(),
        }
    }
}

/// An iterator over the words of a word list.
pub struct WordListIterator<R> {
    iter: Lines<R>,
}

impl<R: BufRead> Iterator for WordListIterator<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in &mut self.iter {
            let line = match line {
                Ok(line) => line,
                Err(error) => return Some(Err(error.into())),
            };

            if !line.is_empty() {
                return Some(Ok(line));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::WordList;

    fn words(text: &str) -> Vec<String> {
        WordList::from_reader(text.as_bytes())
            .into_iter()
            .collect::<crate::Result<_>>()
            .unwrap()
    }

    #[test]
    fn one_word_per_line() {
        assert_eq!(vec!["the", "of", "and"], words("the\nof\nand\n"));
        // Last line without new line.
        assert_eq!(vec!["the", "of"], words("the\nof"));
    }

    #[test]
    fn keep_the_line_as_is() {
        assert_eq!(vec!["New York", "don't", "Éric"], words("New York\r\ndon't\r\nÉric\r\n"));
        assert_eq!(vec![" padded"], words(" padded\n"));
    }

    #[test]
    fn empty_lines() {
        assert_eq!(vec!["a", "b"], words("\na\n\n\r\nb\n\n"));
        assert!(words("").is_empty());
    }

    #[test]
    fn spaces_are_words() {
        assert_eq!(vec![" ", "a", "  "], words(" \na\n  \r\n"));
    }

    #[test]
    fn invalid_utf8() {
        let mut iter = WordList::from_reader(&b"ok\n\xff\xfe\n"[..]).into_iter();

        assert_eq!("ok", iter.next().unwrap().unwrap());
        assert!(iter.next().unwrap().is_err());
    }
}
