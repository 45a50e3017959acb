//! py9 command line: build, query and extend T9 dictionaries.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use py9::keys::{display_path, parse_digits, path_of};
use py9::wordlist::WordList;
use py9::{DictionaryStore, Information, Search, TrieBuilder};

#[derive(Parser)]
#[command(name = "py9")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predictive text dictionaries for phone keypads")]
struct Cli {
    /// Show what is done on the standard error
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a dictionary from a word list (one word per line, most frequent first)
    Generate {
        /// The word list to read
        #[arg(value_name = "WORDLIST")]
        input: PathBuf,

        /// The dictionary file to create
        #[arg(short, long, value_name = "DICT")]
        output: PathBuf,

        /// Language of the words
        #[arg(short, long, default_value = "Unknown")]
        language: String,

        /// Free text stored in the dictionary
        #[arg(short, long, default_value = "")]
        comment: String,
    },

    /// Show the candidate words for key sequences
    Lookup {
        #[arg(value_name = "DICT")]
        dictionary: PathBuf,

        /// Key sequences, like 43556
        #[arg(required = true)]
        digits: Vec<String>,
    },

    /// Add words to an existing dictionary
    Add {
        #[arg(value_name = "DICT")]
        dictionary: PathBuf,

        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Show the keys needed to type words
    Key {
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Show the dictionary metadata and structure
    Info {
        #[arg(value_name = "DICT")]
        dictionary: PathBuf,

        /// Print the trie in the graphviz format instead
        #[arg(long)]
        graph: bool,
    },
}

fn init_tracing(verbose: bool) {
    // Quiet unless asked, RUST_LOG refines what --verbose shows.
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn generate(input: PathBuf, output: PathBuf, language: &str, comment: &str) -> Result<()> {
    let words = WordList::open(&input)
        .with_context(|| format!("Can't read word list {}", input.display()))?;

    let mut builder = TrieBuilder::new();
    for word in words {
        let word = word.with_context(|| format!("Can't read word list {}", input.display()))?;
        builder.add(&word).with_context(|| format!("Can't add {:?}", word))?;
    }

    info!(words = builder.words(), nodes = builder.nodes(), "word list loaded");

    let root = builder.finish();
    let store = DictionaryStore::create(&output, &root, language, comment)
        .with_context(|| format!("Can't write dictionary {}", output.display()))?;

    info!(
        words = store.word_count(),
        root = store.root_offset(),
        path = %output.display(),
        "dictionary created"
    );

    Ok(())
}

fn lookup(dictionary: PathBuf, sequences: &[String]) -> Result<()> {
    let mut store = DictionaryStore::open_read_only(&dictionary)
        .with_context(|| format!("Can't open dictionary {}", dictionary.display()))?;

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    for sequence in sequences {
        let digits = parse_digits(sequence)?;
        let found = store.lookup(&digits)?;

        writeln!(stdout, "{} ({}): {}", sequence, found.kind, found.words.join(" "))?;
    }

    Ok(())
}

fn add(dictionary: PathBuf, words: &[String]) -> Result<()> {
    let mut store = DictionaryStore::open(&dictionary)
        .with_context(|| format!("Can't open dictionary {}", dictionary.display()))?;

    for word in words {
        store.addword(word).with_context(|| format!("Can't add {:?}", word))?;
        info!(word = %word, words = store.word_count(), "added");
    }

    Ok(())
}

fn key(words: &[String]) -> Result<()> {
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    for word in words {
        writeln!(stdout, "{}\t{}", word, display_path(&path_of(word)))?;
    }

    Ok(())
}

fn show_info(dictionary: PathBuf, graph: bool) -> Result<()> {
    let mut store = DictionaryStore::open_read_only(&dictionary)
        .with_context(|| format!("Can't open dictionary {}", dictionary.display()))?;

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    if graph {
        store.graph(&mut stdout)?;
        return Ok(());
    }

    writeln!(stdout, "language: {}", store.language())?;
    writeln!(stdout, "comment:  {}", store.comment())?;
    writeln!(stdout, "words:    {}", store.word_count())?;
    writeln!(stdout, "root:     {}", store.root_offset())?;
    writeln!(stdout, "nodes:    {}", store.nodes()?)?;
    writeln!(stdout, "height:   {}", store.height()?)?;

    let reachable = store.words()?;
    if reachable != store.word_count() as usize {
        writeln!(stdout, "warning:  {} words reachable from the root", reachable)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            input,
            output,
            language,
            comment,
        } => generate(input, output, &language, &comment),
        Commands::Lookup { dictionary, digits } => lookup(dictionary, &digits),
        Commands::Add { dictionary, words } => add(dictionary, &words),
        Commands::Key { words } => key(&words),
        Commands::Info { dictionary, graph } => show_info(dictionary, graph),
    }
}
