//! # Timeline Grammar Module
//!
//! Moderators changed how they type timelines, so each timeline date is parsed
//! with the grammar of its epoch:
//!
//! **Legacy** (up to and including `legacy_until`):
//!
//! ```text
//! 00:01:30 | Hello World | Jane Doe | OriginalSong
//! ```
//!
//! **Current** (from `current_from` on), an optional ordinal, then time and
//! song separated by a full-width space (or four half-width spaces):
//!
//! ```text
//! 1. 03:00:00　Dreamland『OriginalAlbum』Jane Doe
//! 2. 03:05:10　Hello World / Jane Doe
//! ```
//!
//! Dates between two epochs have no grammar. [`EpochTable::select`] returns
//! `None` for them and the caller reports the file instead of guessing.

use crate::config::RuntimeConfig;
use chrono::NaiveDate;
use thiserror::Error;

const LEGACY_SEPARATOR: &str = " | ";
const ARTIST_SEPARATOR: &str = " / ";
const FULL_WIDTH_SPACE: char = '\u{3000}';
const WIDE_GAP: &str = "    ";

/// Why a single timeline line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("expected at least `time | song`")]
    MissingFields,
    #[error("no full-width space between time and song")]
    MissingTimeSeparator,
    #[error("invalid time `{0}`, expected H:M:S")]
    InvalidTime(String),
    #[error("empty song name")]
    EmptySongName,
}

/// One performance as typed on a timeline line, before any rule is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Time as written, with full-width colons normalized.
    pub time: String,
    /// Elapsed seconds into the recording.
    pub seconds: u32,
    pub song_name: String,
    pub artist: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Legacy,
    Current,
}

impl Grammar {
    pub fn parse_line(self, line: &str) -> Result<RawRecord, LineError> {
        match self {
            Self::Legacy => parse_legacy(line),
            Self::Current => parse_current(line),
        }
    }
}

/// Date range (inclusive, open-ended when `None`) using one grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch {
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub grammar: Grammar,
}

impl Epoch {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| from <= date) && self.until.map_or(true, |until| date <= until)
    }
}

/// Ordered epochs; the first one containing a date decides its grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochTable {
    epochs: Vec<Epoch>,
}

impl EpochTable {
    pub fn new(epochs: Vec<Epoch>) -> Self {
        Self { epochs }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(vec![
            Epoch {
                from: None,
                until: Some(config.legacy_until),
                grammar: Grammar::Legacy,
            },
            Epoch {
                from: Some(config.current_from),
                until: None,
                grammar: Grammar::Current,
            },
        ])
    }

    pub fn select(&self, date: NaiveDate) -> Option<Grammar> {
        self.epochs
            .iter()
            .find(|epoch| epoch.contains(date))
            .map(|epoch| epoch.grammar)
    }
}

impl Default for EpochTable {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

/// Parse `H:M:S` (full-width colons allowed) into its normalized text and
/// elapsed seconds.
pub fn parse_time(text: &str) -> Result<(String, u32), LineError> {
    let normalized = text.trim().replace('：', ":");
    let invalid = || LineError::InvalidTime(text.trim().to_string());

    let parts = normalized
        .split(':')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    let [hours, minutes, seconds] = parts.as_slice() else {
        return Err(invalid());
    };

    let elapsed = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes.checked_mul(60)?))
        .and_then(|hm| hm.checked_add(*seconds))
        .ok_or_else(invalid)?;

    Ok((normalized, elapsed))
}

fn parse_legacy(line: &str) -> Result<RawRecord, LineError> {
    // An empty trailing column leaves a dangling `|` once the line is trimmed.
    let mut line = line.trim();
    while let Some(rest) = line.strip_suffix('|') {
        line = rest.trim_end();
    }

    let fields: Vec<&str> = line.splitn(4, LEGACY_SEPARATOR).map(str::trim).collect();
    if fields.len() < 2 {
        return Err(LineError::MissingFields);
    }

    let (time, seconds) = parse_time(fields[0])?;
    let song_name = fields[1];
    if song_name.is_empty() {
        return Err(LineError::EmptySongName);
    }

    Ok(RawRecord {
        time,
        seconds,
        song_name: song_name.to_string(),
        artist: fields.get(2).copied().unwrap_or_default().to_string(),
        source: fields.get(3).copied().unwrap_or_default().to_string(),
    })
}

/// Drop a leading `<digits>.` ordinal followed by whitespace.
fn strip_ordinal(line: &str) -> &str {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix('.') {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => line,
    }
}

/// Split at the first full-width space or four-space gap, whichever comes first.
fn split_time(line: &str) -> Option<(&str, &str)> {
    let full_width = line
        .find(FULL_WIDTH_SPACE)
        .map(|at| (at, FULL_WIDTH_SPACE.len_utf8()));
    let gap = line.find(WIDE_GAP).map(|at| (at, WIDE_GAP.len()));

    let (at, len) = match (full_width, gap) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    Some((&line[..at], &line[at + len..]))
}

fn parse_current(line: &str) -> Result<RawRecord, LineError> {
    let line = strip_ordinal(line.trim());
    let (time, info) = split_time(line).ok_or(LineError::MissingTimeSeparator)?;
    let (time, seconds) = parse_time(time)?;
    let info = info.trim();

    let bracketed = info
        .split_once('『')
        .and_then(|(before, rest)| rest.split_once('』').map(|(source, after)| (before, source, after)));

    let (song_name, artist, source) = match bracketed {
        Some((before, source, after)) => {
            let song_name = before.split_once(ARTIST_SEPARATOR).map_or(before, |(song, _)| song);
            (song_name.trim(), after.trim(), source.trim())
        }
        None => {
            let (song_name, artist) = info.split_once(ARTIST_SEPARATOR).unwrap_or((info, ""));
            (song_name.trim(), artist.trim(), "")
        }
    };

    if song_name.is_empty() {
        return Err(LineError::EmptySongName);
    }

    Ok(RawRecord {
        time,
        seconds,
        song_name: song_name.to_string(),
        artist: artist.to_string(),
        source: source.to_string(),
    })
}
