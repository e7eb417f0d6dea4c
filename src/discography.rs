//! # Discography Module
//!
//! Parses `disc.txt`, the hand-kept list of released works, into the
//! `disc.json` document the site renders next to the song catalog.
//!
//! ```text
//! [Armony]
//! First Light|Single|2023-05-01|https://youtu.be/abc|https://linkco.re/xyz
//! [Solo Works]
//! Night Walk|EP|2024-02-14|OLAK5uy_abcdef
//! ```
//!
//! A `[Section]` line switches the category. Every other line is
//! `title|type|releaseDate|ytUrl[|linkcore]`. Lines outside a known section and
//! lines with the wrong field count are reported and skipped.

use crate::error::{Diagnostics, IngestError};
use crate::rules::rule_lines;
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The fixed discography categories, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Armony,
    OtherCircles,
    Solo,
}

impl Category {
    /// Category for a `[...]` section label, `None` for unknown labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Armony" => Some(Self::Armony),
            "Other Circles" => Some(Self::OtherCircles),
            "Solo Works" => Some(Self::Solo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "releaseDate")]
    pub release_date: String,
    #[serde(rename = "ytUrl")]
    pub yt_url: String,
    pub linkcore: Option<String>,
    /// Filled in later from the video platform; always empty here.
    pub tracks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub description: String,
    pub albums: Vec<Album>,
}

impl Section {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            albums: Vec::new(),
        }
    }
}

/// The whole `disc.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discography {
    pub armony: Section,
    pub other_circles: Section,
    pub solo: Section,
}

impl Default for Discography {
    fn default() -> Self {
        Self {
            armony: Section::new("Armony", "音樂企劃Armony的作品"),
            other_circles: Section::new("Other Circles", "參與其他社團的作品"),
            solo: Section::new("Solo Works", "個人作品"),
        }
    }
}

impl Discography {
    pub fn section_mut(&mut self, category: Category) -> &mut Section {
        match category {
            Category::Armony => &mut self.armony,
            Category::OtherCircles => &mut self.other_circles,
            Category::Solo => &mut self.solo,
        }
    }

    pub fn album_count(&self) -> usize {
        self.armony.albums.len() + self.other_circles.albums.len() + self.solo.albums.len()
    }
}

fn malformed(file: &str, line_no: usize, line: &str, reason: &str) -> IngestError {
    IngestError::MalformedRuleEntry {
        file: file.to_string(),
        line_no,
        line: line.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_album(line: &str) -> Option<Album> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    let (title, kind, release_date, yt_url, linkcore) = match fields.as_slice() {
        [title, kind, date, url] => (title, kind, date, url, None),
        [title, kind, date, url, linkcore] => {
            (title, kind, date, url, Some(*linkcore).filter(|l| !l.is_empty()))
        }
        _ => return None,
    };
    if title.is_empty() {
        return None;
    }
    Some(Album {
        title: title.to_string(),
        kind: kind.to_string(),
        release_date: release_date.to_string(),
        yt_url: yt_url.to_string(),
        linkcore: linkcore.map(str::to_string),
        tracks: Vec::new(),
    })
}

/// Parse the text of a discography file. `file` names it in diagnostics.
pub fn parse_discography(text: &str, file: &str) -> (Discography, Diagnostics) {
    let mut discography = Discography::default();
    let mut diagnostics = Diagnostics::default();
    let mut current = None;

    for (line_no, line) in rule_lines(text) {
        if let Some(label) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = Category::from_label(label.trim());
            if current.is_none() {
                diagnostics.push(malformed(file, line_no, line, "unknown section"));
            }
            continue;
        }

        let Some(category) = current else {
            diagnostics.push(malformed(file, line_no, line, "album outside a known section"));
            continue;
        };
        match parse_album(line) {
            Some(album) => discography.section_mut(category).albums.push(album),
            None => diagnostics.push(malformed(
                file,
                line_no,
                line,
                "expected title|type|releaseDate|ytUrl[|linkcore]",
            )),
        }
    }

    (discography, diagnostics)
}

/// Read and parse a discography file.
pub fn load(path: &Path) -> Result<(Discography, Diagnostics)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read discography {}", path.display()))?;
    let file = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
    let (discography, diagnostics) = parse_discography(&text, &file);
    info!("Parsed {} albums from {}", discography.album_count(), path.display());
    Ok((discography, diagnostics))
}

pub fn write_json(path: &Path, discography: &Discography) -> Result<()> {
    let mut json =
        serde_json::to_string_pretty(discography).context("Failed to serialize discography")?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
