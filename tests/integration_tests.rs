//! # Integration Tests for Setlist
//!
//! End-to-end catalog builds over on-disk timeline directories, checking the
//! properties the catalog must hold regardless of input order.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use setlist::catalog::{self, build_catalog, CatalogOptions, SongEntry};
use setlist::config::RuntimeConfig;
use setlist::error::IngestError;
use setlist::rules::RuleSet;
use setlist::timeline::{self, TimelineSource};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EXCEPTIONS: &str = "\
member_exclusive_dates|20240110
private|20240201_2
private_id|gone42
copyright|Blocked Song
copyright|Cover|Band A
";

const ACAPELLA: &str = "\
Lullaby
Duet|Jane Doe
Hello World|Jane Doe|20240110,20240201
";

const HEADERS: &str = "\
D|D,d
H|H,h,'the Hello'
ど|ど,と
";

/// Test helper to create a timeline directory with rule files and a mix of
/// both grammars, plus a few broken files.
fn create_timeline_dir() -> Result<TempDir> {
    let dir = TempDir::new()?;
    let write = |name: &str, text: &str| fs::write(dir.path().join(name), text);

    write("exceptions.txt", EXCEPTIONS)?;
    write("acapella.txt", ACAPELLA)?;
    write("headers.txt", HEADERS)?;

    write(
        "20240105.txt",
        "ID = abc123\n\
         00:01:30 | Hello World | Jane Doe | OriginalSong\n\
         00:05:00 | Lullaby | John Roe | Folk\n\
         00:09:00 | Cover | Band A\n\
         00:12:00 | Blocked Song | Band B\n",
    )?;
    write(
        "20240110.txt",
        "ID = def456\n\
         00:02:00 | hello world | jane doe |\n\
         00:04:00 | Blocked Song | Anyone | Film\n\
         not a timeline line\n",
    )?;
    write(
        "20240201.txt",
        "ID = xyz999\n\
         1. 03:00:00　Dreamland『OriginalAlbum』Jane Doe\n\
         2. 03:10:00　Hello  World / Jane Doe\n\
         3. 03:20:00　Cover / Band B\n",
    )?;
    write(
        "20240201_2.txt",
        "ID = gone42\n\
         1. 00:10:00　Duet / Jane Doe\n",
    )?;
    write("20240123.txt", "ID = gap\n00:00:10 | Gap Song | X\n")?;
    write("20240301.txt", "00:00:10 | Missing Header | X\n")?;
    write("20240302.txt", "")?;

    Ok(dir)
}

fn build_dir(dir: &Path) -> Result<(Vec<SongEntry>, Vec<IngestError>)> {
    let config = RuntimeConfig::default();
    let (rules, mut diagnostics) = RuleSet::load(dir, &config)?;
    let (sources, read_diagnostics) = timeline::read_dir(dir, &config)?;
    diagnostics.extend(read_diagnostics);
    let build = build_catalog(&sources, &rules, &CatalogOptions::from_config(&config));
    diagnostics.extend(build.diagnostics);
    Ok((build.entries, diagnostics.into_iter().collect()))
}

fn find<'a>(entries: &'a [SongEntry], song: &str, artist: &str) -> &'a SongEntry {
    entries
        .iter()
        .find(|e| e.song_name == song && e.artist == artist)
        .unwrap_or_else(|| panic!("no entry for {song} / {artist}"))
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_legacy_scenario_exact_output() -> Result<()> {
        let sources = [TimelineSource::new(
            "20240115.txt",
            "ID = abc123\n00:01:30 | Hello World | Jane Doe | OriginalSong\n",
        )];
        let build = build_catalog(&sources, &RuleSet::default(), &CatalogOptions::default());
        let json: serde_json::Value = serde_json::from_str(&catalog::to_json(&build.entries)?)?;

        assert_eq!(
            json,
            serde_json::json!([{
                "song_name": "Hello World",
                "artist": "Jane Doe",
                "source": "OriginalSong",
                "is_copyright": false,
                "az": null,
                "dates": [{
                    "date": "20240115",
                    "time": "00:01:30",
                    "link": "https://www.youtube.com/watch?v=abc123&t=90s",
                    "is_member_exclusive": false,
                    "is_acapella": false,
                    "is_private": false
                }]
            }])
        );
        Ok(())
    }

    #[test]
    fn test_current_scenario() {
        let sources = [TimelineSource::new(
            "20240201.txt",
            "ID = xyz999\n1. 03:00:00　Dreamland『OriginalAlbum』Jane Doe\n",
        )];
        let build = build_catalog(&sources, &RuleSet::default(), &CatalogOptions::default());
        assert_eq!(build.entries.len(), 1);
        let entry = &build.entries[0];
        assert_eq!(entry.song_name, "Dreamland");
        assert_eq!(entry.source, "OriginalAlbum");
        assert_eq!(entry.artist, "Jane Doe");
        assert_eq!(
            entry.occurrences[0].link,
            "https://www.youtube.com/watch?v=xyz999&t=10800s"
        );
    }

    #[test]
    fn test_grammar_boundaries() {
        let line_legacy = "ID = v\n00:00:10 | Song | X\n";
        let line_current = "ID = v\n1. 00:00:10　Song / X\n";
        let options = CatalogOptions::default();
        let rules = RuleSet::default();

        let legacy = build_catalog(&[TimelineSource::new("20240120.txt", line_legacy)], &rules, &options);
        assert_eq!(legacy.entries.len(), 1);
        assert!(legacy.diagnostics.is_empty());

        let current = build_catalog(&[TimelineSource::new("20240127.txt", line_current)], &rules, &options);
        assert_eq!(current.entries.len(), 1);
        assert!(current.diagnostics.is_empty());

        for name in ["20240121.txt", "20240126.txt"] {
            let gap = build_catalog(&[TimelineSource::new(name, line_legacy)], &rules, &options);
            assert!(gap.entries.is_empty());
            assert!(matches!(
                gap.diagnostics.iter().next(),
                Some(IngestError::UnhandledDateRange { .. })
            ));
        }
    }
}

#[cfg(test)]
mod directory_tests {
    use super::*;

    #[test]
    fn test_full_directory_build() -> Result<()> {
        let dir = create_timeline_dir()?;
        let (entries, diagnostics) = build_dir(dir.path())?;

        // Hello World merges across case, whitespace and both grammars.
        let hello = find(&entries, "Hello World", "Jane Doe");
        assert_eq!(hello.source, "OriginalSong");
        assert_eq!(hello.bucket.as_deref(), Some("H"));
        let flags: Vec<(&str, bool, bool)> = hello
            .occurrences
            .iter()
            .map(|o| (o.date.as_str(), o.is_member_exclusive, o.is_acapella))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("20240105", false, false),
                ("20240110", true, false),
                ("20240201", false, false),
            ]
        );

        // Acapella by date matches raw text only: "hello world"/"Hello  World" differ.
        let lullaby = find(&entries, "Lullaby", "John Roe");
        assert!(lullaby.occurrences[0].is_acapella);

        let duet = find(&entries, "Duet", "Jane Doe");
        assert!(duet.occurrences[0].is_acapella);
        assert!(duet.occurrences[0].is_private);
        assert_eq!(duet.occurrences[0].date, "20240201_2");

        // The wildcard rule covers every artist singing the song.
        assert!(find(&entries, "Blocked Song", "Anyone").is_copyright);
        assert!(find(&entries, "Blocked Song", "Band B").is_copyright);
        assert!(find(&entries, "Cover", "Band A").is_copyright);
        assert!(!find(&entries, "Cover", "Band B").is_copyright);
        assert_eq!(find(&entries, "Dreamland", "Jane Doe").bucket.as_deref(), Some("D"));

        assert_eq!(entries.len(), 8);

        let mut kinds: Vec<&str> = diagnostics
            .iter()
            .map(|e| match e {
                IngestError::MalformedLine { .. } => "line",
                IngestError::MalformedFileHeader { .. } => "header",
                IngestError::UnreadableFile { .. } => "unreadable",
                IngestError::UnhandledDateRange { .. } => "gap",
                IngestError::InvalidFileName { .. } => "name",
                IngestError::MalformedRuleEntry { .. } => "rule",
            })
            .collect();
        kinds.sort_unstable();
        assert_eq!(kinds, vec!["gap", "header", "line", "unreadable"]);
        Ok(())
    }

    #[test]
    fn test_build_is_idempotent() -> Result<()> {
        let dir = create_timeline_dir()?;
        let (first, _) = build_dir(dir.path())?;
        let (second, _) = build_dir(dir.path())?;
        assert_eq!(catalog::to_json(&first)?, catalog::to_json(&second)?);
        Ok(())
    }

    #[test]
    fn test_missing_rule_files_give_empty_rules() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join("20240115.txt"),
            "ID = abc\n00:00:10 | Lullaby | X\n",
        )?;
        let (entries, diagnostics) = build_dir(dir.path())?;
        assert!(diagnostics.is_empty());
        assert!(!entries[0].occurrences[0].is_acapella);
        Ok(())
    }

    #[test]
    fn test_json_file_round_trip() -> Result<()> {
        let dir = create_timeline_dir()?;
        let (entries, _) = build_dir(dir.path())?;
        let path = dir.path().join("data.json");
        catalog::write_json(&path, &entries)?;

        let loaded = catalog::read_json(&path)?;
        assert_eq!(loaded.len(), entries.len());
        assert_eq!(
            catalog::video_ids(&loaded).into_iter().collect::<Vec<_>>(),
            vec!["abc123", "def456", "gone42", "xyz999"]
        );
        Ok(())
    }
}

#[cfg(test)]
mod order_independence_tests {
    use super::*;

    fn sources() -> Vec<TimelineSource> {
        vec![
            TimelineSource::new("20240101.txt", "ID = a\n00:00:10 | Song A | X | First\n00:01:00 | Other | Y\n"),
            TimelineSource::new("20240102.txt", "ID = b\n00:00:10 | song a | x | Second\n"),
            TimelineSource::new("20240102_2.txt", "ID = c\n00:00:10 | SONGA | X\n"),
            TimelineSource::new("20240201.txt", "ID = d\n1. 00:00:10　Song A / X\n2. 00:00:20　Other / Y\n"),
            // Same slot as 20240101 in a second copy of that file.
            TimelineSource::new("20240101.txt", "ID = a\n00:00:10 | Song  A | X | Copy\n"),
        ]
    }

    fn identity_sets(entries: &[SongEntry]) -> BTreeSet<(String, String, Vec<(String, String)>)> {
        entries
            .iter()
            .map(|e| {
                let occurrences = e
                    .occurrences
                    .iter()
                    .map(|o| (o.date.clone(), o.time.clone()))
                    .collect();
                (e.song_name.clone(), e.artist.clone(), occurrences)
            })
            .collect()
    }

    #[test]
    fn test_shuffled_inputs_give_identical_output() -> Result<()> {
        let options = CatalogOptions::default();
        let rules = RuleSet::default();
        let reference = build_catalog(&sources(), &rules, &options);
        let reference_json = catalog::to_json(&reference.entries)?;

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut shuffled = sources();
            shuffled.shuffle(&mut rng);
            let build = build_catalog(&shuffled, &rules, &options);
            assert_eq!(identity_sets(&build.entries), identity_sets(&reference.entries));
            assert_eq!(catalog::to_json(&build.entries)?, reference_json);
        }
        Ok(())
    }

    #[test]
    fn test_duplicate_slot_from_two_files_collapses() {
        let build = build_catalog(&sources(), &RuleSet::default(), &CatalogOptions::default());
        let song = build
            .entries
            .iter()
            .find(|e| e.song_name == "Song  A" || e.song_name == "Song A")
            .expect("merged entry");
        let dates: Vec<&str> = song.occurrences.iter().map(|o| o.date.as_str()).collect();
        assert_eq!(dates, vec!["20240101", "20240102", "20240102_2", "20240201"]);
    }
}
