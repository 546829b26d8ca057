//! # readalong CLI (`ral`)
//!
//! The `ral` binary indexes books and locates transcript snippets in them.
//!
//! ## Usage
//!
//! ```bash
//! ral --config ./config/readalong.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ral init` | Create the SQLite database and run schema migrations |
//! | `ral index <book>` | Build (or reload) the index of a book |
//! | `ral locate <book> "<transcript>"` | Find where a transcript snippet is in a book |
//! | `ral list` | List persisted book indexes |
//! | `ral forget <hash>` | Delete a persisted index |
//! | `ral chapters <book> --chapters <file>` | Print chapter chunk ranges |
//!
//! ## Examples
//!
//! ```bash
//! # Index a book with its chapter boundaries
//! ral index ./books/moby-dick.txt --chapters ./books/moby-dick.chapters.json
//!
//! # Locate a snippet within chapter 3, highlighting the exact words
//! ral locate ./books/moby-dick.txt "call me ishmael some years ago" --chapter 3 --span
//!
//! # Machine-readable output
//! ral locate ./books/moby-dick.txt "call me ishmael" --json
//! ```

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use readalong::locate::LocateRequest;
use readalong::{config, index_cmd, locate, logging, migrate};

/// readalong CLI: locate noisy speech-transcript snippets in a book.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "ral",
    about = "readalong: locate noisy speech-transcript snippets in a book",
    version,
    long_about = "readalong splits a book into sentence and paragraph chunks, indexes them by \
    word n-grams, and matches transcript snippets against them with fuzzy word alignment, \
    n-gram overlap, and edit distance. Indexes are persisted by content hash."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/readalong.toml`.
    #[arg(long, global = true, default_value = "./config/readalong.toml")]
    config: PathBuf,

    /// Increase log verbosity (`-v` info, `-vv` debug). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `book_indexes` table.
    /// Running it multiple times is safe.
    Init,

    /// Build or reload the index of a book.
    ///
    /// Reuses a persisted index when one exists for the exact same text;
    /// otherwise builds and persists a new one.
    Index {
        /// Path to the book as UTF-8 plain text.
        book: PathBuf,

        /// Title stored with the index. Defaults to the file name.
        #[arg(long)]
        title: Option<String>,

        /// JSON file with an array of `{ "id", "title", "text" }` chapters.
        #[arg(long)]
        chapters: Option<PathBuf>,
    },

    /// Locate a transcript snippet in a book.
    ///
    /// Prints the best-matching chunk with its index and score, or
    /// "No match." when nothing scores above the threshold.
    Locate {
        /// Path to the book as UTF-8 plain text.
        book: PathBuf,

        /// The transcript snippet.
        transcript: String,

        /// JSON file with an array of `{ "id", "title", "text" }` chapters.
        #[arg(long)]
        chapters: Option<PathBuf>,

        /// Restrict the search to this chapter (matched by id, then title).
        #[arg(long)]
        chapter: Option<String>,

        /// Override the acceptance threshold from config.
        #[arg(long)]
        threshold: Option<f64>,

        /// Also report the exact run of matched words.
        #[arg(long)]
        span: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// List persisted book indexes.
    List,

    /// Delete a persisted book index.
    Forget {
        /// Book hash as printed by `ral index` or `ral list`.
        hash: String,
    },

    /// Print the chunk range of each chapter.
    Chapters {
        /// Path to the book as UTF-8 plain text.
        book: PathBuf,

        /// JSON file with an array of `{ "id", "title", "text" }` chapters.
        #[arg(long)]
        chapters: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index {
            book,
            title,
            chapters,
        } => {
            index_cmd::run_index(&cfg, &book, title.as_deref(), chapters.as_deref()).await?;
        }
        Commands::Locate {
            book,
            transcript,
            chapters,
            chapter,
            threshold,
            span,
            json,
        } => {
            let req = LocateRequest {
                book: &book,
                transcript: &transcript,
                chapters: chapters.as_deref(),
                chapter: chapter.as_deref(),
                threshold,
                span,
                json,
            };
            locate::run_locate(&cfg, &req).await?;
        }
        Commands::List => {
            index_cmd::run_list(&cfg).await?;
        }
        Commands::Forget { hash } => {
            index_cmd::run_forget(&cfg, &hash).await?;
        }
        Commands::Chapters { book, chapters } => {
            index_cmd::run_chapters(&cfg, &book, &chapters).await?;
        }
    }

    Ok(())
}
