//! Identity folding for the catalog merge key.
//!
//! Rule lookups deliberately do not go through here: exception and acapella
//! rules match the raw text the moderator typed.

use std::fmt;

/// Lowercase and drop every whitespace character.
#[must_use]
pub fn fold(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalized `(song, artist)` pair identifying one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityKey {
    pub song: String,
    pub artist: String,
}

impl IdentityKey {
    #[must_use]
    pub fn new(song_name: &str, artist: &str) -> Self {
        Self {
            song: fold(song_name),
            artist: fold(artist),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.song, self.artist)
    }
}
