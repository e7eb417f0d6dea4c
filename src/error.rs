//! # Diagnostics Module
//!
//! Every problem found while ingesting timelines or rule files is reported as an
//! [`IngestError`]. None of them abort a batch: the affected line, rule entry or
//! file is skipped and the error is collected so operators can fix the input.
//!
//! ## Scope of each variant
//!
//! | Variant               | Skips        |
//! |-----------------------|--------------|
//! | `MalformedLine`       | one line     |
//! | `MalformedRuleEntry`  | one rule     |
//! | `MalformedFileHeader` | whole file   |
//! | `UnreadableFile`      | whole file   |
//! | `InvalidFileName`     | whole file   |
//! | `UnhandledDateRange`  | whole file   |

use std::fmt;
use thiserror::Error;

/// A non-fatal problem found while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// A timeline line that neither grammar could make sense of.
    #[error("{file}:{line_no}: malformed line `{line}`: {reason}")]
    MalformedLine {
        file: String,
        line_no: usize,
        line: String,
        reason: String,
    },

    /// The first line of a timeline is not `ID = <videoId>`.
    #[error("{file}: malformed header `{line}`, expected `ID = <videoId>`")]
    MalformedFileHeader { file: String, line: String },

    #[error("{file}: unreadable timeline: {reason}")]
    UnreadableFile { file: String, reason: String },

    /// File name is not `<YYYYMMDD>[_<n>].txt`.
    #[error("{file}: not a timeline file name, expected `<YYYYMMDD>[_<n>].txt`")]
    InvalidFileName { file: String },

    #[error("{file}:{line_no}: skipped rule `{line}`: {reason}")]
    MalformedRuleEntry {
        file: String,
        line_no: usize,
        line: String,
        reason: String,
    },

    /// The file date falls between two grammar epochs.
    #[error("{file}: date {date} is not covered by any timeline grammar")]
    UnhandledDateRange { file: String, date: String },
}

impl IngestError {
    /// File the diagnostic refers to.
    pub fn file(&self) -> &str {
        match self {
            Self::MalformedLine { file, .. }
            | Self::MalformedFileHeader { file, .. }
            | Self::UnreadableFile { file, .. }
            | Self::InvalidFileName { file }
            | Self::MalformedRuleEntry { file, .. }
            | Self::UnhandledDateRange { file, .. } => file,
        }
    }

    /// 1-based line number, `0` for file-level diagnostics.
    pub fn line_no(&self) -> usize {
        match self {
            Self::MalformedLine { line_no, .. } | Self::MalformedRuleEntry { line_no, .. } => {
                *line_no
            }
            Self::MalformedFileHeader { .. } => 1,
            _ => 0,
        }
    }

    /// Whether the whole file was dropped because of this diagnostic.
    pub fn skips_file(&self) -> bool {
        matches!(
            self,
            Self::MalformedFileHeader { .. }
                | Self::UnreadableFile { .. }
                | Self::InvalidFileName { .. }
                | Self::UnhandledDateRange { .. }
        )
    }
}

/// Collected diagnostics of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<IngestError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: IngestError) {
        log::warn!("{error}");
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IngestError> {
        self.errors.iter()
    }

    /// Order by file then line, so reports do not depend on scheduling.
    pub fn sort(&mut self) {
        self.errors.sort_by(|a, b| {
            (a.file(), a.line_no())
                .cmp(&(b.file(), b.line_no()))
                .then_with(|| a.to_string().cmp(&b.to_string()))
        });
    }

    /// Number of files dropped entirely.
    pub fn skipped_files(&self) -> usize {
        self.errors.iter().filter(|e| e.skips_file()).count()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{error}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = IngestError;
    type IntoIter = std::vec::IntoIter<IngestError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_orders_by_file_then_line() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(IngestError::MalformedLine {
            file: "20240201.txt".to_string(),
            line_no: 5,
            line: "x".to_string(),
            reason: "no time".to_string(),
        });
        diagnostics.push(IngestError::UnreadableFile {
            file: "20240101.txt".to_string(),
            reason: "empty".to_string(),
        });
        diagnostics.push(IngestError::MalformedLine {
            file: "20240201.txt".to_string(),
            line_no: 2,
            line: "y".to_string(),
            reason: "no time".to_string(),
        });

        diagnostics.sort();
        let order: Vec<(&str, usize)> = diagnostics.iter().map(|e| (e.file(), e.line_no())).collect();
        assert_eq!(
            order,
            vec![("20240101.txt", 0), ("20240201.txt", 2), ("20240201.txt", 5)]
        );
    }

    #[test]
    fn test_file_level_errors_are_counted() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(IngestError::UnhandledDateRange {
            file: "20240122.txt".to_string(),
            date: "20240122".to_string(),
        });
        diagnostics.push(IngestError::MalformedRuleEntry {
            file: "acapella.txt".to_string(),
            line_no: 3,
            line: "a|b|c|d".to_string(),
            reason: "too many fields".to_string(),
        });
        assert_eq!(diagnostics.skipped_files(), 1);
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_display_includes_context() {
        let error = IngestError::MalformedLine {
            file: "20240115.txt".to_string(),
            line_no: 3,
            line: "garbage".to_string(),
            reason: "missing song name".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("20240115.txt:3"));
        assert!(text.contains("garbage"));
    }
}
