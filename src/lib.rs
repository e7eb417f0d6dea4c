//! Song catalog builder for karaoke stream timelines.
//!
//! Core modules:
//! - [`rules`] - Exception, acapella and header rule files
//! - [`grammar`] - Timeline line grammars and their date epochs
//! - [`timeline`] - Timeline files and their `ID = ...` header
//! - [`normalize`] - Identity folding for the merge key
//! - [`bucket`] - Alphabet/kana bucket classification
//! - [`catalog`] - Merging performances into song entries
//!
//! ### Supporting Modules
//!
//! - [`config`] - Runtime configuration and data directory
//! - [`error`] - Diagnostics collected during a build
//! - [`store`] - SQLite export
//! - [`discography`] - `disc.txt` to `disc.json`
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use setlist::catalog::{build_catalog, CatalogOptions};
//! use setlist::rules::RuleSet;
//! use setlist::timeline::TimelineSource;
//!
//! let sources = vec![TimelineSource::new(
//!     "20240115.txt",
//!     "ID = abc123\n00:01:30 | Hello World | Jane Doe | OriginalSong\n",
//! )];
//!
//! let build = build_catalog(&sources, &RuleSet::default(), &CatalogOptions::default());
//! assert_eq!(build.entries.len(), 1);
//! assert_eq!(
//!     build.entries[0].occurrences[0].link,
//!     "https://www.youtube.com/watch?v=abc123&t=90s"
//! );
//! assert!(build.diagnostics.is_empty());
//! ```
//!
//! ## Error Handling
//!
//! Problems in the input never abort a build. Broken lines, files and rule
//! entries are collected as [`error::IngestError`] values next to the catalog.
//! Everything else (I/O on outputs, configuration, database) returns
//! `Result<T, anyhow::Error>`.

pub mod bucket;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod discography;
pub mod error;
pub mod grammar;
pub mod normalize;
pub mod rules;
pub mod store;
pub mod timeline;
