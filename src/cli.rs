//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for setlist using Clap derive
//! macros.
//!
//! ## Commands
//!
//! - `build`: Parse a timeline directory into `data.json` (and optionally SQLite)
//! - `search`: Find songs in a built catalog
//! - `video-ids`: List the recordings a catalog links to
//! - `mark-private`: Record deleted or private recordings in `exceptions.txt`
//! - `disc`: Convert `disc.txt` into `disc.json`
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! setlist build timeline --output data.json
//! setlist search "hello world"
//! setlist video-ids | deleted-video-checker | xargs setlist mark-private timeline/exceptions.txt
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser)]
#[command(name = "setlist")]
#[command(about = "Setlist: karaoke stream timelines turned into a searchable song catalog")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the song catalog from a directory of timelines
    ///
    /// Reads every `<YYYYMMDD>[_<n>].txt` file, applies the rule files and
    /// writes the merged catalog as JSON. Broken lines and files are reported
    /// on stderr and skipped.
    Build {
        /// Directory holding the timeline files
        #[arg(value_hint = clap::ValueHint::DirPath)]
        timeline_dir: PathBuf,

        /// Directory holding exceptions.txt, acapella.txt and headers.txt
        ///
        /// Defaults to the timeline directory.
        #[arg(long, value_hint = clap::ValueHint::DirPath)]
        rules_dir: Option<PathBuf>,

        /// Where to write the JSON catalog
        #[arg(short, long, default_value = "data.json")]
        output: PathBuf,

        /// Also store the catalog in SQLite
        #[arg(long)]
        store: bool,

        /// SQLite database for the stored catalog (implies `--store`)
        ///
        /// Defaults to catalog.db in the platform data directory.
        #[arg(long)]
        db: Option<PathBuf>,

        /// TOML configuration file (grammar cutovers, link format, merge policy)
        #[arg(short, long, env = "SETLIST_CONFIG")]
        config: Option<PathBuf>,

        /// Exit with an error if any line, file or rule was skipped
        #[arg(long)]
        strict: bool,
    },

    /// Search a built catalog by song name, artist or source
    Search {
        /// Case-insensitive text to look for
        query: String,

        /// Catalog produced by `build`
        #[arg(long, default_value = "data.json")]
        catalog: PathBuf,
    },

    /// Print every video id referenced by a catalog, one per line
    VideoIds {
        /// Catalog produced by `build`
        #[arg(long, default_value = "data.json")]
        catalog: PathBuf,
    },

    /// Add deleted or private video ids to the `private_id` rule
    MarkPrivate {
        /// The exceptions file to update (created if missing)
        exceptions: PathBuf,

        /// Video ids to mark private
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Convert the discography list into JSON
    Disc {
        /// Discography text file with `[Section]` headers
        #[arg(default_value = "timeline/disc.txt", value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Where to write the JSON discography
        #[arg(short, long, default_value = "disc.json")]
        output: PathBuf,
    },

    /// Generate shell completions
    ///
    /// Usage: setlist completion bash > ~/.local/share/bash-completion/completions/setlist
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_build_defaults() {
        let args = Args::parse_from(["setlist", "build", "timeline"]);
        match args.command {
            Command::Build { timeline_dir, rules_dir, output, store, db, strict, .. } => {
                assert_eq!(timeline_dir, PathBuf::from("timeline"));
                assert!(rules_dir.is_none());
                assert_eq!(output, PathBuf::from("data.json"));
                assert!(!store);
                assert!(db.is_none());
                assert!(!strict);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_build_with_database() {
        let args = Args::parse_from(["setlist", "build", "timeline", "--db", "songs.db"]);
        match args.command {
            Command::Build { db, .. } => assert_eq!(db, Some(PathBuf::from("songs.db"))),
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_mark_private_requires_ids() {
        assert!(Args::try_parse_from(["setlist", "mark-private", "exceptions.txt"]).is_err());
        let args = Args::parse_from(["setlist", "mark-private", "exceptions.txt", "a", "b"]);
        match args.command {
            Command::MarkPrivate { ids, .. } => assert_eq!(ids, vec!["a", "b"]),
            _ => panic!("expected mark-private"),
        }
    }

    #[test]
    fn test_disc_defaults() {
        let args = Args::parse_from(["setlist", "disc"]);
        match args.command {
            Command::Disc { input, output } => {
                assert_eq!(input, PathBuf::from("timeline/disc.txt"));
                assert_eq!(output, PathBuf::from("disc.json"));
            }
            _ => panic!("expected disc"),
        }
    }
}
