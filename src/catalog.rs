//! # Catalog Module
//!
//! Folds parsed timelines into one catalog: a [`SongEntry`] per normalized
//! `(song, artist)` identity, each carrying every dated performance of it.
//!
//! ## Pipeline
//!
//! 1. every [`TimelineSource`] is parsed on the rayon pool; each record gets
//!    its flags resolved against the shared [`RuleSet`]
//! 2. the per-file results are folded sequentially, in input order, into an
//!    ordered map keyed by [`IdentityKey`]
//! 3. entries are emitted in key order with occurrences sorted by date, then
//!    time
//!
//! ## Merge Policy
//!
//! Entry fields (`song_name`, `artist`, `source`, `is_copyright`, `az`) come from
//! the chronologically earliest performance of the identity, so the result does
//! not depend on which file was read first. [`MergePolicy::LatestSource`] takes
//! `source` from the newest performance that names one instead.
//!
//! Two performances of one identity at the same `(date, time)` collapse into
//! one occurrence; the one that orders first is kept.
//!
//! ## Output
//!
//! ```json
//! [
//!   {
//!     "song_name": "Hello World",
//!     "artist": "Jane Doe",
//!     "source": "OriginalSong",
//!     "is_copyright": false,
//!     "az": null,
//!     "dates": [
//!       {
//!         "date": "20240115",
//!         "time": "00:01:30",
//!         "link": "https://www.youtube.com/watch?v=abc123&t=90s",
//!         "is_member_exclusive": false,
//!         "is_acapella": false,
//!         "is_private": false
//!       }
//!     ]
//!   }
//! ]
//! ```

use crate::config::{MergePolicy, RuntimeConfig};
use crate::error::Diagnostics;
use crate::grammar::EpochTable;
use crate::normalize::IdentityKey;
use crate::rules::RuleSet;
use crate::timeline::{parse_timeline, TimelineFile, TimelineSource};
use anyhow::{Context, Result};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// One dated performance of a song.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    pub date: String,
    /// Elapsed seconds of `time`; only used for ordering and deduplication.
    #[serde(skip)]
    pub seconds: u32,
    pub time: String,
    pub link: String,
    pub is_member_exclusive: bool,
    pub is_acapella: bool,
    pub is_private: bool,
}

/// Aggregated record of one normalized song/artist identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongEntry {
    pub song_name: String,
    pub artist: String,
    pub source: String,
    pub is_copyright: bool,
    #[serde(rename = "az")]
    pub bucket: Option<String>,
    #[serde(rename = "dates")]
    pub occurrences: Vec<Occurrence>,
}

impl SongEntry {
    /// Most recent performance. Occurrences are kept sorted by date and
    /// elapsed seconds, and JSON preserves that order.
    pub fn latest_occurrence(&self) -> Option<&Occurrence> {
        self.occurrences.last()
    }
}

/// Settings of a catalog build that do not come from the rule files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOptions {
    pub epochs: EpochTable,
    pub link_base: String,
    pub merge_policy: MergePolicy,
}

impl CatalogOptions {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            epochs: EpochTable::from_config(config),
            link_base: config.link_base.clone(),
            merge_policy: config.merge_policy,
        }
    }
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

/// Catalog entries plus everything that was skipped on the way.
#[derive(Debug, Clone, Default)]
pub struct CatalogBuild {
    pub entries: Vec<SongEntry>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub entries: usize,
    pub occurrences: usize,
}

/// Deep link into `video_id` at `seconds`.
pub fn deep_link(link_base: &str, video_id: &str, seconds: u32) -> String {
    format!("{link_base}?v={video_id}&t={seconds}s")
}

/// Entry fields as read from one performance.
#[derive(Debug, Clone)]
struct EntryFields {
    song_name: String,
    artist: String,
    source: String,
    is_copyright: bool,
    bucket: Option<String>,
}

/// A parsed record with every rule applied.
#[derive(Debug, Clone)]
struct Performance {
    key: IdentityKey,
    fields: EntryFields,
    occurrence: Occurrence,
}

impl Performance {
    /// Chronological position, raw text breaks ties.
    fn origin(&self) -> (&str, u32, &str, &str, &str) {
        (
            &self.occurrence.date,
            self.occurrence.seconds,
            &self.fields.song_name,
            &self.fields.artist,
            &self.fields.source,
        )
    }
}

type Origin = (String, u32, String, String, String);

fn owned_origin(performance: &Performance) -> Origin {
    let (date, seconds, song, artist, source) = performance.origin();
    (
        date.to_string(),
        seconds,
        song.to_string(),
        artist.to_string(),
        source.to_string(),
    )
}

/// Resolve the rule flags of every record of a file.
fn performances(file: &TimelineFile, rules: &RuleSet, link_base: &str) -> Vec<Performance> {
    let is_member_exclusive = rules.is_member_exclusive(&file.date);
    let is_private = rules.is_private(&file.date, &file.video_id);

    file.records
        .iter()
        .map(|record| Performance {
            key: IdentityKey::new(&record.song_name, &record.artist),
            fields: EntryFields {
                song_name: record.song_name.clone(),
                artist: record.artist.clone(),
                source: record.source.clone(),
                is_copyright: rules.is_copyright(&record.song_name, &record.artist),
                bucket: rules.bucket_for(&record.song_name).map(str::to_string),
            },
            occurrence: Occurrence {
                date: file.date.clone(),
                seconds: record.seconds,
                time: record.time.clone(),
                link: deep_link(link_base, &file.video_id, record.seconds),
                is_member_exclusive,
                is_acapella: rules.is_acapella(&file.date, &record.song_name, &record.artist),
                is_private,
            },
        })
        .collect()
}

/// Entry under construction.
struct Accumulator {
    origin: Origin,
    fields: EntryFields,
    /// Newest performance with a non-empty source, for `LatestSource`.
    latest_source: Option<(Origin, String)>,
    occurrences: BTreeMap<(String, u32), Occurrence>,
}

impl Accumulator {
    fn new(performance: Performance) -> Self {
        let mut accumulator = Self {
            origin: owned_origin(&performance),
            fields: performance.fields.clone(),
            latest_source: None,
            occurrences: BTreeMap::new(),
        };
        accumulator.add(performance);
        accumulator
    }

    fn add(&mut self, performance: Performance) {
        let origin = owned_origin(&performance);

        if !performance.fields.source.is_empty()
            && self
                .latest_source
                .as_ref()
                .map_or(true, |(latest, _)| origin > *latest)
        {
            self.latest_source = Some((origin.clone(), performance.fields.source.clone()));
        }

        if origin < self.origin {
            self.origin = origin;
            self.fields = performance.fields;
        }

        let occurrence = performance.occurrence;
        let slot = (occurrence.date.clone(), occurrence.seconds);
        match self.occurrences.get_mut(&slot) {
            Some(existing) => {
                debug!("Duplicate performance at {} {}", occurrence.date, occurrence.time);
                if occurrence < *existing {
                    *existing = occurrence;
                }
            }
            None => {
                self.occurrences.insert(slot, occurrence);
            }
        }
    }

    fn finish(self, policy: MergePolicy) -> SongEntry {
        let source = match (policy, self.latest_source) {
            (MergePolicy::LatestSource, Some((_, source))) => source,
            _ => self.fields.source,
        };

        SongEntry {
            song_name: self.fields.song_name,
            artist: self.fields.artist,
            source,
            is_copyright: self.fields.is_copyright,
            bucket: self.fields.bucket,
            occurrences: self.occurrences.into_values().collect(),
        }
    }
}

/// Sequential merge of per-file performances.
#[derive(Default)]
pub struct CatalogAggregator {
    entries: BTreeMap<IdentityKey, Accumulator>,
}

impl CatalogAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every record of `file` into the catalog.
    pub fn add_file(&mut self, file: &TimelineFile, rules: &RuleSet, link_base: &str) {
        self.extend(performances(file, rules, link_base));
    }

    fn extend(&mut self, performances: Vec<Performance>) {
        for performance in performances {
            match self.entries.get_mut(&performance.key) {
                Some(accumulator) => accumulator.add(performance),
                None => {
                    self.entries
                        .insert(performance.key.clone(), Accumulator::new(performance));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in identity order, occurrences by date then time.
    pub fn finish(self, policy: MergePolicy) -> Vec<SongEntry> {
        self.entries
            .into_values()
            .map(|accumulator| accumulator.finish(policy))
            .collect()
    }
}

/// Build the catalog for `sources`.
///
/// Files are parsed in parallel; malformed lines and rejected files end up in
/// the returned diagnostics and never stop the build.
pub fn build_catalog(
    sources: &[TimelineSource],
    rules: &RuleSet,
    options: &CatalogOptions,
) -> CatalogBuild {
    let parsed: Vec<(Option<Vec<Performance>>, Diagnostics)> = sources
        .par_iter()
        .map(|source| {
            let outcome = parse_timeline(source, &options.epochs);
            let resolved = outcome
                .file
                .map(|file| performances(&file, rules, &options.link_base));
            (resolved, outcome.diagnostics)
        })
        .collect();

    let mut aggregator = CatalogAggregator::new();
    let mut diagnostics = Diagnostics::new();
    let mut files = 0;
    for (resolved, file_diagnostics) in parsed {
        if let Some(resolved) = resolved {
            files += 1;
            aggregator.extend(resolved);
        }
        diagnostics.extend(file_diagnostics);
    }
    diagnostics.sort();

    let entries = aggregator.finish(options.merge_policy);
    info!(
        "Built catalog of {} songs from {files} of {} timeline files ({} diagnostics)",
        entries.len(),
        sources.len(),
        diagnostics.len()
    );

    CatalogBuild { entries, diagnostics }
}

pub fn stats(entries: &[SongEntry]) -> CatalogStats {
    CatalogStats {
        entries: entries.len(),
        occurrences: entries.iter().map(|e| e.occurrences.len()).sum(),
    }
}

/// Lowercase and unify the wave dashes moderators use interchangeably.
fn search_fold(text: &str) -> String {
    text.to_lowercase()
        .replace(|c: char| c == '\u{301c}' || c == '\u{ff5e}', "~")
}

/// Entries whose song name, artist or source contains `query`.
pub fn search<'a>(entries: &'a [SongEntry], query: &str) -> Vec<&'a SongEntry> {
    let query = search_fold(query.trim());
    entries
        .iter()
        .filter(|entry| {
            query.is_empty()
                || search_fold(&entry.song_name).contains(&query)
                || search_fold(&entry.artist).contains(&query)
                || search_fold(&entry.source).contains(&query)
        })
        .collect()
}

/// Distinct recording ids referenced by the catalog links.
pub fn video_ids(entries: &[SongEntry]) -> BTreeSet<String> {
    entries
        .iter()
        .flat_map(|entry| &entry.occurrences)
        .filter_map(|occurrence| {
            let (_, rest) = occurrence.link.rsplit_once("v=")?;
            let id = rest.split('&').next()?;
            (!id.is_empty()).then(|| id.to_string())
        })
        .collect()
}

pub fn to_json(entries: &[SongEntry]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(entries).context("Failed to serialize catalog")?;
    json.push('\n');
    Ok(json)
}

pub fn write_json(path: &Path, entries: &[SongEntry]) -> Result<()> {
    fs::write(path, to_json(entries)?)
        .with_context(|| format!("Failed to write catalog to {}", path.display()))
}

pub fn read_json(path: &Path) -> Result<Vec<SongEntry>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid catalog {}", path.display()))
}
