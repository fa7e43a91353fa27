//!
//! src/types.rs  Andrew Belles  Sept 14th, 2025
//!
//! Records shared across the sync: scraped names, catalog matches, the
//! preview, and the write target
//!

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A trimmed, non-empty performer name scraped from a page
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateName(String);

impl CandidateName {
    pub fn parse(raw: &str) -> Option<CandidateName> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(CandidateName(trimmed.to_string()))
        }
    }

    /// Trims, drops empties and keeps the first occurrence of each name.
    /// Uniqueness is case-sensitive.
    pub fn collect_unique<I, S>(raw: I) -> Vec<CandidateName>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>
    {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter_map(|s| CandidateName::parse(s.as_ref()))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtistId(pub String);

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Artist record as returned by a catalog search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogArtist {
    pub id: ArtistId,
    pub name: String,
}

/// Track record as returned by the catalog, in the catalog's ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub album: String,
    pub uri: String,
}

/// Best (top-1) catalog match for one candidate name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistMatch {
    pub candidate: CandidateName,
    pub artist_id: ArtistId,
    pub catalog_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub display_title: String,
    pub uri: String,
}

impl From<CatalogTrack> for TrackRef {
    fn from(track: CatalogTrack) -> Self {
        TrackRef {
            display_title: format!("{} ({})", track.name, track.album),
            uri: track.uri,
        }
    }
}

/// One artist that made it through resolution and enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub name: CandidateName,
    pub tracks: Vec<TrackRef>,
}

impl PreviewEntry {
    pub fn track_uris(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|t| t.uri.as_str())
    }
}

/// Flattens entries into the URI list written to the destination, in order
pub fn collect_track_uris(entries: &[PreviewEntry]) -> Vec<String> {
    entries.iter()
        .flat_map(|e| e.track_uris())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    NoArtistMatch,
    NoTracks,
    ResolveFailed(String),
    EnrichFailed(String),
    /// The credential was missing or rejected while handling this name
    AuthExpired,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoArtistMatch => f.write_str("no artist match"),
            SkipReason::NoTracks => f.write_str("no tracks"),
            SkipReason::ResolveFailed(e) => write!(f, "resolve failed: {e}"),
            SkipReason::EnrichFailed(e) => write!(f, "enrich failed: {e}"),
            SkipReason::AuthExpired => f.write_str("catalog authorization expired"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub name: CandidateName,
    pub reason: SkipReason,
}

/// Outcome of one pipeline run: kept entries in input order plus every
/// dropped candidate and why
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub entries: Vec<PreviewEntry>,
    pub skipped: Vec<Skipped>,
}

impl Resolution {
    pub fn track_count(&self) -> usize {
        self.entries.iter().map(|e| e.tracks.len()).sum()
    }

    /// True when any candidate was dropped because the credential stopped
    /// working; the preview is then incomplete until the user reconnects
    pub fn needs_reconnect(&self) -> bool {
        self.skipped.iter().any(|s| s.reason == SkipReason::AuthExpired)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub country: Option<String>,
}

/// Playlist summary as listed for the current user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub collaborative: bool,
    pub public: Option<bool>,
    pub tracks_total: u32,
}

impl Collection {
    pub fn is_writable_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.collaborative
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollection {
    pub name: String,
    pub description: String,
    pub public: bool,
}

/// One page of an offset-paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_offset: Option<u32>,
}

/// What the user picked as write target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Existing(String),
    CreateNew { name: String },
}

impl FromStr for Selection {
    type Err = std::convert::Infallible;

    /// `new` requests creation (name supplied separately), anything else is
    /// taken as an existing collection id
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "new" {
            Ok(Selection::CreateNew { name: String::new() })
        } else {
            Ok(Selection::Existing(s.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub destination_id: String,
    pub created: bool,
    pub cleared: usize,
    pub appended: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_names_are_trimmed_and_deduplicated() {
        let names = CandidateName::collect_unique(
            ["  Alpha ", "Beta", "", "Alpha", "alpha", "   "]
        );
        let names: Vec<&str> = names.iter().map(CandidateName::as_str).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "alpha"]);
    }

    #[test]
    fn track_label_includes_release() {
        let track = CatalogTrack {
            id: "t1".into(),
            name: "Song".into(),
            album: "Record".into(),
            uri: "spotify:track:t1".into(),
        };
        let r = TrackRef::from(track);
        assert_eq!(r.display_title, "Song (Record)");
        assert_eq!(r.uri, "spotify:track:t1");
    }

    #[test]
    fn selection_parses_new_and_ids() {
        assert_eq!(
            "new".parse::<Selection>().unwrap(),
            Selection::CreateNew { name: String::new() }
        );
        assert_eq!(
            " 37i9dQZF1DX ".parse::<Selection>().unwrap(),
            Selection::Existing("37i9dQZF1DX".into())
        );
    }

    #[test]
    fn only_auth_skips_ask_for_reconnect() {
        let skip = |reason| Skipped { name: CandidateName::parse("A").unwrap(), reason };
        let mut resolution = Resolution {
            entries: vec![],
            skipped: vec![skip(SkipReason::NoArtistMatch), skip(SkipReason::EnrichFailed("500".into()))],
        };
        assert!(!resolution.needs_reconnect());

        resolution.skipped.push(skip(SkipReason::AuthExpired));
        assert!(resolution.needs_reconnect());
    }

    #[test]
    fn collaborative_collections_are_writable() {
        let mut c = Collection {
            id: "p".into(),
            name: "P".into(),
            owner_id: "someone".into(),
            collaborative: false,
            public: Some(true),
            tracks_total: 3,
        };
        assert!(!c.is_writable_by("me"));
        c.collaborative = true;
        assert!(c.is_writable_by("me"));
        c.collaborative = false;
        c.owner_id = "me".into();
        assert!(c.is_writable_by("me"));
    }
}
