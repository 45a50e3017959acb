use std::io::{self, BufRead, Read, Seek, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::warn;

use py9::keys::parse_digits;
use py9::{DictionaryStore, Search};

/// Read one key sequence per line on the standard input
/// and write its candidates as a json object per line.
#[derive(Parser)]
#[command(name = "py9-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// The dictionary to search in
    #[arg(value_name = "DICT")]
    dictionary: PathBuf,
}

/// What is written for a line of the standard input.
#[derive(Serialize)]
#[serde(untagged)]
enum Answer<'a> {
    Candidates {
        digits: &'a str,
        kind: &'static str,
        depth: usize,
        words: Vec<String>,
    },
    /// The line is not a key sequence, the next ones are still answered.
    Invalid { digits: &'a str, error: String },
}

fn answer<'a, S: Read + Seek>(
    searcher: &mut DictionaryStore<S>,
    digits: &'a str,
) -> py9::Result<Answer<'a>> {
    let keys = match parse_digits(digits) {
        Ok(keys) => keys,
        Err(error) => {
            warn!(digits, %error, "invalid key sequence");
            return Ok(Answer::Invalid {
                digits,
                error: error.to_string(),
            });
        }
    };

    let found = searcher.lookup(&keys)?;

    Ok(Answer::Candidates {
        digits,
        kind: found.kind.as_str(),
        depth: found.depth,
        words: found.words,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut searcher = DictionaryStore::open_read_only(&args.dictionary)
        .with_context(|| format!("Could not load the dictionary {}", args.dictionary.display()))?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let digits = line.trim();
        if digits.is_empty() {
            continue;
        }

        serde_json::to_writer(&mut stdout, &answer(&mut searcher, digits)?)?;
        writeln!(stdout)?;
        stdout.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use py9::{codec, TrieBuilder};

    fn searcher(words: &[&str]) -> DictionaryStore<Cursor<Vec<u8>>> {
        let root = TrieBuilder::build(words).unwrap();
        let mut file = Cursor::new(Vec::new());
        codec::write_dictionary(&mut file, &root, "Test", "").unwrap();
        DictionaryStore::from_source(file).unwrap()
    }

    fn json(searcher: &mut DictionaryStore<Cursor<Vec<u8>>>, digits: &str) -> String {
        serde_json::to_string(&answer(searcher, digits).unwrap()).unwrap()
    }

    #[test]
    fn candidates() {
        let mut searcher = searcher(&["hello", "gelled"]);

        assert_eq!(
            r#"{"digits":"43556","kind":"exact","depth":5,"words":["hello"]}"#,
            json(&mut searcher, "43556")
        );
        assert_eq!(
            r#"{"digits":"1","kind":"miss","depth":0,"words":[]}"#,
            json(&mut searcher, "1")
        );
    }

    #[test]
    fn invalid_line_is_answered() {
        let mut searcher = searcher(&["hello"]);

        assert_eq!(
            r#"{"digits":"43a","error":"invalid key digit 'a'"}"#,
            json(&mut searcher, "43a")
        );
        // The following lines still get their candidates.
        assert_eq!(
            r#"{"digits":"43556","kind":"exact","depth":5,"words":["hello"]}"#,
            json(&mut searcher, "43556")
        );
    }
}
