//! # Rule Loading Module
//!
//! Parses the three moderator-maintained rule files into one immutable
//! [`RuleSet`]:
//!
//! - `exceptions.txt`: directive lines (`member_exclusive_dates`, `private`,
//!   `private_id`, `copyright`)
//! - `acapella.txt`: `song`, `song|artist` or `song|artist|date,date`
//! - `headers.txt`: `label|token,token` bucket definitions
//!
//! Broken entries are reported and skipped, the rest of the file still loads.
//! A missing rule file yields empty tables.
//!
//! Song and artist lookups match the raw moderator text, not the folded
//! identity used by the catalog merge.

use crate::bucket::BucketTable;
use crate::config::RuntimeConfig;
use crate::error::{Diagnostics, IngestError};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

/// Immutable rule tables shared by every parse of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub member_exclusive_dates: HashSet<String>,
    pub private_dates: HashSet<String>,
    pub private_video_ids: HashSet<String>,
    /// `(song, None)` matches every artist.
    pub copyright_songs: HashSet<(String, Option<String>)>,
    pub acapella_global: HashSet<String>,
    pub acapella_by_artist: HashMap<String, HashSet<String>>,
    pub acapella_by_date_artist: HashMap<String, HashMap<String, HashSet<String>>>,
    pub header_buckets: BucketTable,
}

/// Raw contents of the three rule files; `None` for a missing file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSources<'a> {
    pub exceptions: Option<&'a str>,
    pub acapella: Option<&'a str>,
    pub headers: Option<&'a str>,
}

/// Names used when reporting rule diagnostics.
const EXCEPTIONS: &str = "exceptions.txt";
const ACAPELLA: &str = "acapella.txt";
const HEADERS: &str = "headers.txt";

/// Matches a full `YYYYMMDD_n` stem or its base date.
fn contains_date(dates: &HashSet<String>, date: &str) -> bool {
    dates.contains(date) || base_date(date).is_some_and(|base| dates.contains(base))
}

/// `20240115_2` -> `20240115`; `None` when there is no suffix.
fn base_date(date: &str) -> Option<&str> {
    date.split_once('_').map(|(base, _)| base)
}

impl RuleSet {
    /// Build the tables from in-memory file contents.
    pub fn from_sources(sources: RuleSources<'_>) -> (Self, Diagnostics) {
        let mut rules = Self::default();
        let mut diagnostics = Diagnostics::new();

        if let Some(text) = sources.exceptions {
            parse_exceptions(text, EXCEPTIONS, &mut rules, &mut diagnostics);
        }
        if let Some(text) = sources.acapella {
            parse_acapella(text, ACAPELLA, &mut rules, &mut diagnostics);
        }
        if let Some(text) = sources.headers {
            parse_headers(text, HEADERS, &mut rules.header_buckets, &mut diagnostics);
        }

        (rules, diagnostics)
    }

    /// Read the rule files configured in `config` from `dir`.
    ///
    /// Missing files are logged and treated as empty. Any other I/O failure is
    /// returned as an error.
    pub fn load(dir: &Path, config: &RuntimeConfig) -> Result<(Self, Diagnostics)> {
        let exceptions = read_optional(&dir.join(&config.exceptions_file))?;
        let acapella = read_optional(&dir.join(&config.acapella_file))?;
        let headers = read_optional(&dir.join(&config.headers_file))?;

        let (rules, diagnostics) = Self::from_sources(RuleSources {
            exceptions: exceptions.as_deref(),
            acapella: acapella.as_deref(),
            headers: headers.as_deref(),
        });

        info!(
            "Loaded rules: {} member-only dates, {} private dates, {} private videos, {} copyright songs, {} header buckets",
            rules.member_exclusive_dates.len(),
            rules.private_dates.len(),
            rules.private_video_ids.len(),
            rules.copyright_songs.len(),
            rules.header_buckets.len()
        );
        Ok((rules, diagnostics))
    }

    pub fn is_member_exclusive(&self, date: &str) -> bool {
        contains_date(&self.member_exclusive_dates, date)
    }

    pub fn is_private(&self, date: &str, video_id: &str) -> bool {
        contains_date(&self.private_dates, date) || self.private_video_ids.contains(video_id)
    }

    pub fn is_copyright(&self, song_name: &str, artist: &str) -> bool {
        self.copyright_songs
            .contains(&(song_name.to_string(), Some(artist.to_string())))
            || self.copyright_songs.contains(&(song_name.to_string(), None))
    }

    /// Global, then artist-scoped, then date+artist-scoped entries.
    pub fn is_acapella(&self, date: &str, song_name: &str, artist: &str) -> bool {
        if self.acapella_global.contains(song_name) {
            return true;
        }
        if self
            .acapella_by_artist
            .get(artist)
            .is_some_and(|songs| songs.contains(song_name))
        {
            return true;
        }

        let by_date = |key: &str| {
            self.acapella_by_date_artist
                .get(key)
                .and_then(|artists| artists.get(artist))
                .is_some_and(|songs| songs.contains(song_name))
        };
        by_date(date) || base_date(date).is_some_and(by_date)
    }

    pub fn bucket_for(&self, song_name: &str) -> Option<&str> {
        self.header_buckets.classify(song_name)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => {
            debug!("Read rule file {}", path.display());
            Ok(Some(text))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Rule file {} not found, using empty rules", path.display());
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read rule file {}", path.display())),
    }
}

/// Non-empty, non-comment lines with their 1-based number.
pub(crate) fn rule_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim().trim_start_matches('\u{feff}')))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn fields(line: &str) -> Vec<&str> {
    line.split('|').map(str::trim).collect()
}

fn comma_list(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn malformed(file: &str, line_no: usize, line: &str, reason: impl Into<String>) -> IngestError {
    IngestError::MalformedRuleEntry {
        file: file.to_string(),
        line_no,
        line: line.to_string(),
        reason: reason.into(),
    }
}

fn parse_exceptions(text: &str, file: &str, rules: &mut RuleSet, diagnostics: &mut Diagnostics) {
    for (line_no, line) in rule_lines(text) {
        let fields = fields(line);

        if fields[0] == "copyright" {
            match fields.as_slice() {
                [_, song] if !song.is_empty() => {
                    rules.copyright_songs.insert((song.to_string(), None));
                }
                [_, song, artist] if !song.is_empty() => {
                    let artist = (!artist.is_empty()).then(|| artist.to_string());
                    rules.copyright_songs.insert((song.to_string(), artist));
                }
                _ => diagnostics.push(malformed(
                    file,
                    line_no,
                    line,
                    "expected `copyright|song` or `copyright|song|artist`",
                )),
            }
            continue;
        }

        let target = match fields[0] {
            "member_exclusive_dates" => &mut rules.member_exclusive_dates,
            "private" => &mut rules.private_dates,
            "private_id" => &mut rules.private_video_ids,
            other => {
                debug!("{file}:{line_no}: ignoring unknown directive `{other}`");
                continue;
            }
        };
        if fields.len() != 2 {
            diagnostics.push(malformed(file, line_no, line, "expected `directive|a,b,...`"));
            continue;
        }
        let values = comma_list(fields[1]);
        if values.is_empty() {
            diagnostics.push(malformed(file, line_no, line, "empty value list"));
            continue;
        }
        target.extend(values);
    }
}

fn parse_acapella(text: &str, file: &str, rules: &mut RuleSet, diagnostics: &mut Diagnostics) {
    for (line_no, line) in rule_lines(text) {
        match fields(line).as_slice() {
            [song] if !song.is_empty() => {
                rules.acapella_global.insert(song.to_string());
            }
            [song, artist] if !song.is_empty() => {
                rules
                    .acapella_by_artist
                    .entry(artist.to_string())
                    .or_default()
                    .insert(song.to_string());
            }
            [song, artist, dates] if !song.is_empty() => {
                let dates = comma_list(dates);
                if dates.is_empty() {
                    diagnostics.push(malformed(file, line_no, line, "empty date list"));
                    continue;
                }
                for date in dates {
                    rules
                        .acapella_by_date_artist
                        .entry(date)
                        .or_default()
                        .entry(artist.to_string())
                        .or_default()
                        .insert(song.to_string());
                }
            }
            [_] | [_, _] | [_, _, _] => {
                diagnostics.push(malformed(file, line_no, line, "empty song name"));
            }
            _ => diagnostics.push(malformed(file, line_no, line, "expected 1 to 3 fields")),
        }
    }
}

fn parse_headers(text: &str, file: &str, buckets: &mut BucketTable, diagnostics: &mut Diagnostics) {
    for (line_no, line) in rule_lines(text) {
        let (label, tokens) = match fields(line).as_slice() {
            [label, tokens] if !label.is_empty() => (label.to_string(), tokens.to_string()),
            _ => {
                diagnostics.push(malformed(file, line_no, line, "expected `label|token,token`"));
                continue;
            }
        };

        let bucket = buckets.bucket_mut(&label);
        for token in tokens.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let quoted = token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'');
            if quoted {
                bucket.exact_names.insert(token[1..token.len() - 1].to_string());
                continue;
            }

            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    bucket.leading_chars.insert(c);
                }
                _ => diagnostics.push(malformed(
                    file,
                    line_no,
                    line,
                    format!("token `{token}` is neither a single character nor a quoted name"),
                )),
            }
        }
    }
}

/// Merge newly found private video ids into exceptions file content.
///
/// The `private_id` directive ends up holding the sorted union of the old and
/// new ids. Other lines keep their text and order; the directive is appended
/// if it did not exist and any further `private_id` lines are folded into the
/// first one.
#[must_use]
pub fn merge_private_ids<I, S>(text: &str, new_ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ids: BTreeSet<String> = new_ids
        .into_iter()
        .map(|id| id.as_ref().trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    let is_private_id = |line: &str| line.split('|').next().map(str::trim) == Some("private_id");

    for line in text.lines().filter(|line| is_private_id(line)) {
        if let Some((_, values)) = line.split_once('|') {
            ids.extend(comma_list(values));
        }
    }

    let directive = format!("private_id|{}", ids.into_iter().collect::<Vec<_>>().join(","));
    let mut out: Vec<String> = Vec::new();
    let mut written = false;
    for line in text.lines() {
        if is_private_id(line) {
            if !written {
                out.push(directive.clone());
                written = true;
            }
        } else {
            out.push(line.to_string());
        }
    }
    if !written {
        out.push(directive);
    }

    let mut merged = out.join("\n");
    merged.push('\n');
    merged
}
