//! Timeline files: `<YYYYMMDD>[_<n>].txt`, first line `ID = <videoId>`, then
//! one performance per line in the grammar of the file's date.

use crate::config::RuntimeConfig;
use crate::error::{Diagnostics, IngestError};
use crate::grammar::{EpochTable, RawRecord};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, trace};
use std::fs;
use std::path::Path;

/// Name and raw contents of one timeline file, as handed to the catalog build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSource {
    pub name: String,
    pub text: String,
}

impl TimelineSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A timeline whose header and date were accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineFile {
    pub name: String,
    /// File stem, `YYYYMMDD` or `YYYYMMDD_n`.
    pub date: String,
    pub day: NaiveDate,
    pub video_id: String,
    pub records: Vec<RawRecord>,
}

/// Result of parsing one file; `file` is `None` when the whole file was
/// rejected.
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub file: Option<TimelineFile>,
    pub diagnostics: Diagnostics,
}

/// Split `20240115_2.txt` into its stem and calendar date.
pub fn parse_file_name(name: &str) -> Option<(String, NaiveDate)> {
    let stem = name.strip_suffix(".txt")?;
    let (day, suffix) = match stem.split_once('_') {
        Some((day, suffix)) => (day, Some(suffix)),
        None => (stem, None),
    };

    if day.len() != 8 || !day.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(suffix) = suffix {
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    let date = NaiveDate::parse_from_str(day, "%Y%m%d").ok()?;
    Some((stem.to_string(), date))
}

/// Video id from an `ID = <videoId>` header line.
pub fn parse_header(line: &str) -> Option<String> {
    let (key, value) = line.trim_start_matches('\u{feff}').split_once('=')?;
    let value = value.trim();
    if !key.trim().eq_ignore_ascii_case("id") || value.is_empty() || value.contains(char::is_whitespace) {
        return None;
    }
    Some(value.to_string())
}

/// Parse one timeline with the grammar of its epoch.
pub fn parse_timeline(source: &TimelineSource, epochs: &EpochTable) -> FileOutcome {
    let mut diagnostics = Diagnostics::new();
    let file = source.name.clone();

    let Some((date, day)) = parse_file_name(&source.name) else {
        diagnostics.push(IngestError::InvalidFileName { file });
        return FileOutcome { file: None, diagnostics };
    };

    let mut lines = source.text.lines();
    let Some(header) = lines.next().filter(|_| !source.text.trim().is_empty()) else {
        diagnostics.push(IngestError::UnreadableFile {
            file,
            reason: "file is empty".to_string(),
        });
        return FileOutcome { file: None, diagnostics };
    };

    let Some(video_id) = parse_header(header) else {
        diagnostics.push(IngestError::MalformedFileHeader {
            file,
            line: header.trim().to_string(),
        });
        return FileOutcome { file: None, diagnostics };
    };

    let Some(grammar) = epochs.select(day) else {
        diagnostics.push(IngestError::UnhandledDateRange { file, date });
        return FileOutcome { file: None, diagnostics };
    };
    debug!("Parsing {} ({video_id}) with {grammar:?} grammar", source.name);

    let mut records = Vec::new();
    for (index, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match grammar.parse_line(line) {
            Ok(record) => {
                trace!("{}: {} at {}", source.name, record.song_name, record.time);
                records.push(record);
            }
            Err(reason) => diagnostics.push(IngestError::MalformedLine {
                file: file.clone(),
                line_no: index + 2,
                line: line.trim().to_string(),
                reason: reason.to_string(),
            }),
        }
    }

    FileOutcome {
        file: Some(TimelineFile {
            name: file,
            date,
            day,
            video_id,
            records,
        }),
        diagnostics,
    }
}

/// Read every timeline file in `dir`, sorted by name.
///
/// Files that are not `.txt`, and rule or other ignored files, are skipped
/// silently. Files that cannot be read are reported as `UnreadableFile`.
pub fn read_dir(dir: &Path, config: &RuntimeConfig) -> Result<(Vec<TimelineSource>, Diagnostics)> {
    let mut diagnostics = Diagnostics::new();
    let mut paths = Vec::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read timeline directory {}", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("Failed to list timeline directory {}", dir.display()))?
            .path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !path.is_file() || !name.ends_with(".txt") || config.is_ignored(&name) {
            debug!("Skipping {}", path.display());
            continue;
        }
        paths.push((name, path));
    }
    paths.sort();

    let mut sources = Vec::with_capacity(paths.len());
    for (name, path) in paths {
        match fs::read_to_string(&path) {
            Ok(text) => sources.push(TimelineSource::new(name, text)),
            Err(e) => diagnostics.push(IngestError::UnreadableFile {
                file: name,
                reason: e.to_string(),
            }),
        }
    }

    debug!("Found {} timeline files in {}", sources.len(), dir.display());
    Ok((sources, diagnostics))
}
