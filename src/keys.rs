//! The keypad layout: every character belongs to exactly one digit key.
//! Digit 0 is the space key, digit 1 holds the punctuation and everything
//! that isn't found in the other keys.

use std::fmt;

use crate::{Error, Result};

/// Characters of each key, indexed by the key digit.
/// All letters are upper case as characters are upper-cased before lookup.
const KEYS: [&str; 10] = [
    " ",
    ".,!?\"'():;=+-/@|£$%*<>[]\\^_{}~#",
    "ABCÀÂÄÅÁÆßÇ",
    "DEFÐÈÉÊ",
    "GHIÎÏÍ",
    "JKL",
    "MNOÓÖÔØÑ",
    "PQRS",
    "TUVÚÜ",
    "WXYZÝ",
];

/// A keypad digit, always between 0 and 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyDigit(u8);

impl KeyDigit {
    /// The space key.
    pub const SPACE: KeyDigit = KeyDigit(0);
    /// The punctuation key, also used for unknown characters.
    pub const PUNCTUATION: KeyDigit = KeyDigit(1);

    /// Number of existing digits, so the number of children a node can have.
    pub const COUNT: usize = 10;

    pub fn new(digit: u8) -> Option<Self> {
        if (digit as usize) < KeyDigit::COUNT {
            Some(KeyDigit(digit))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Index of the digit in a node children table.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// All digits in ascending order.
    pub fn all() -> impl Iterator<Item = KeyDigit> {
        (0..KeyDigit::COUNT as u8).map(KeyDigit)
    }
}

impl fmt::Display for KeyDigit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Get the key on which the given character is located.
///
/// The lookup is case insensitive. The whole upper case form is searched,
/// so a character whose upper case is several characters long
/// (like 'ß' giving "SS") is not found and goes to the punctuation key.
pub fn digit_of(character: char) -> KeyDigit {
    let upper: String = character.to_uppercase().collect();

    KEYS.iter()
        .position(|key| key.contains(upper.as_str()))
        .map(|digit| KeyDigit(digit as u8))
        .unwrap_or(KeyDigit::PUNCTUATION)
}

/// Get the keys that need to be pressed to type the given word,
/// one digit per character.
pub fn path_of(word: &str) -> Vec<KeyDigit> {
    word.chars().map(digit_of).collect()
}

/// Parse a typed key sequence like "43556".
pub fn parse_digits(digits: &str) -> Result<Vec<KeyDigit>> {
    digits
        .chars()
        .map(|c| {
            c.to_digit(10)
                .map(|digit| KeyDigit(digit as u8))
                .ok_or(Error::InvalidDigit(c))
        })
        .collect()
}

/// Render a digit path the way it is typed.
pub fn display_path(path: &[KeyDigit]) -> String {
    path.iter().map(|digit| char::from(b'0' + digit.0)).collect()
}
