//! SQLite export of a built catalog.
//!
//! Every export replaces the previous content, so the database always mirrors
//! the last `data.json`.

use crate::catalog::{Occurrence, SongEntry};
use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS songs (
        id           INTEGER PRIMARY KEY,
        song_name    TEXT    NOT NULL,
        artist       TEXT    NOT NULL,
        source       TEXT    NOT NULL,
        is_copyright INTEGER NOT NULL,
        az           TEXT
    );
    CREATE TABLE IF NOT EXISTS performances (
        id                  INTEGER PRIMARY KEY,
        song_id             INTEGER NOT NULL REFERENCES songs(id),
        date                TEXT    NOT NULL,
        time                TEXT    NOT NULL,
        link                TEXT    NOT NULL,
        is_member_exclusive INTEGER NOT NULL,
        is_acapella         INTEGER NOT NULL,
        is_private          INTEGER NOT NULL,
        UNIQUE(song_id, date, time)
    );
    CREATE INDEX IF NOT EXISTS idx_performances_date ON performances(date);
";

pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open catalog database {}", path.display()))?;
    conn.execute_batch(SCHEMA)
        .context("Failed to create catalog tables")?;
    Ok(conn)
}

/// Replace the stored catalog with `entries` in one transaction.
pub fn write_catalog(conn: &mut Connection, entries: &[SongEntry]) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM performances", [])?;
    tx.execute("DELETE FROM songs", [])?;

    {
        let mut song_stmt = tx.prepare(
            "INSERT INTO songs (song_name, artist, source, is_copyright, az) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut performance_stmt = tx.prepare(
            "INSERT INTO performances (song_id, date, time, link, is_member_exclusive, is_acapella, is_private)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for entry in entries {
            let song_id = song_stmt
                .insert(params![
                    entry.song_name,
                    entry.artist,
                    entry.source,
                    entry.is_copyright,
                    entry.bucket
                ])
                .with_context(|| format!("Failed to insert song `{}`", entry.song_name))?;

            for Occurrence {
                date,
                time,
                link,
                is_member_exclusive,
                is_acapella,
                is_private,
                ..
            } in &entry.occurrences
            {
                performance_stmt
                    .execute(params![
                        song_id,
                        date,
                        time,
                        link,
                        is_member_exclusive,
                        is_acapella,
                        is_private
                    ])
                    .with_context(|| {
                        format!("Failed to insert performance of `{}` on {date}", entry.song_name)
                    })?;
            }
            debug!("Stored {} with {} performances", entry.song_name, entry.occurrences.len());
        }
    }

    tx.commit().context("Committing catalog transaction failed")?;
    info!("Stored {} songs", entries.len());
    Ok(())
}

/// Open `path` and replace its catalog.
pub fn export(path: &Path, entries: &[SongEntry]) -> Result<()> {
    let mut conn = open(path)?;
    write_catalog(&mut conn, entries)
}
