//! # Header Bucket Module
//!
//! Assigns a song name to a browsing bucket (an `A`-`Z` letter, a kana row, ...).
//! Buckets are defined in `headers.txt`; each bucket owns two kinds of tokens:
//!
//! - **exact names**: full song names written in single quotes, used for titles
//!   whose first character would put them in the wrong bucket
//! - **leading characters**: single characters matched against the first
//!   character of the song name
//!
//! Exact names are checked across all buckets before any leading character.
//! Within either pass the first bucket in definition order wins.

use std::collections::HashSet;

/// One bucket label and its match tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub exact_names: HashSet<String>,
    pub leading_chars: HashSet<char>,
}

/// Buckets in the order they were defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketTable {
    buckets: Vec<Bucket>,
}

impl BucketTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bucket for `label`, appending it if it was not defined yet.
    /// A label defined twice keeps its first position.
    pub fn bucket_mut(&mut self, label: &str) -> &mut Bucket {
        let index = match self.buckets.iter().position(|b| b.label == label) {
            Some(index) => index,
            None => {
                self.buckets.push(Bucket {
                    label: label.to_string(),
                    ..Default::default()
                });
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[index]
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.label.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Classify `song_name`, `None` when no bucket matches.
    #[must_use]
    pub fn classify(&self, song_name: &str) -> Option<&str> {
        if let Some(bucket) = self
            .buckets
            .iter()
            .find(|b| b.exact_names.contains(song_name))
        {
            return Some(bucket.label.as_str());
        }

        let first = song_name.chars().next()?;
        self.buckets
            .iter()
            .find(|b| b.leading_chars.contains(&first))
            .map(|b| b.label.as_str())
    }
}
