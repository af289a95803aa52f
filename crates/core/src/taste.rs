//! Local listening statistics
//!
//! Counts how often artists and tracks are played through the player agent.
//! The counts feed the "prefer known artists" tie-break in music matching.

use std::collections::{BTreeMap, HashSet};

use actionarc_domain::Track;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserTaste {
    /// Artist display name -> plays
    pub artist_counts: BTreeMap<String, u32>,
    /// Track URI -> plays
    pub track_counts: BTreeMap<String, u32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserTaste {
    pub fn is_empty(&self) -> bool {
        self.artist_counts.is_empty() && self.track_counts.is_empty()
    }

    pub fn record_tracks(&mut self, tracks: &[Track]) {
        if tracks.is_empty() {
            return;
        }
        for track in tracks {
            *self.track_counts.entry(track.uri.clone()).or_default() += 1;
            for artist in &track.artists {
                *self.artist_counts.entry(artist.clone()).or_default() += 1;
            }
        }
        self.updated_at = Some(Utc::now());
    }

    /// Most played artists, ties broken alphabetically.
    pub fn top_artists(&self, k: usize) -> Vec<(String, u32)> {
        let mut artists: Vec<_> = self.artist_counts.iter().map(|(n, c)| (n.clone(), *c)).collect();
        artists.sort_by(|(na, ca), (nb, cb)| cb.cmp(ca).then_with(|| na.cmp(nb)));
        artists.truncate(k);
        artists
    }

    /// Lowercased names of every artist played at least once.
    pub fn known_artists(&self) -> HashSet<String> {
        self.artist_counts.keys().map(|n| n.to_lowercase()).collect()
    }

    pub fn is_known_artist(&self, name: &str) -> bool {
        self.artist_counts.keys().any(|n| crate::matching::same_name(n, name))
    }

    /// Adds another set of counts into this one.
    pub fn merge(&mut self, other: &UserTaste) {
        for (name, count) in &other.artist_counts {
            *self.artist_counts.entry(name.clone()).or_default() += count;
        }
        for (uri, count) in &other.track_counts {
            *self.track_counts.entry(uri.clone()).or_default() += count;
        }
        self.updated_at = self.updated_at.max(other.updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(uri: &str, artists: &[&str]) -> Track {
        Track {
            id: uri.into(),
            name: uri.into(),
            uri: uri.into(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            album: None,
            duration_ms: 0,
            popularity: 0,
        }
    }

    #[test]
    fn records_and_ranks_artists() {
        let mut taste = UserTaste::default();
        taste.record_tracks(&[
            track("t1", &["Björk"]),
            track("t2", &["Portishead"]),
            track("t3", &["Björk", "Thom Yorke"]),
        ]);

        assert_eq!(taste.top_artists(2), vec![("Björk".to_string(), 2), ("Portishead".to_string(), 1)]);
        assert!(taste.is_known_artist("portishead"));
        assert!(taste.known_artists().contains("thom yorke"));
        assert!(taste.updated_at.is_some());
    }

    #[test]
    fn merge_sums_counts() {
        let mut a = UserTaste::default();
        a.record_tracks(&[track("t1", &["Air"])]);
        let mut b = UserTaste::default();
        b.record_tracks(&[track("t1", &["Air"]), track("t2", &["Moby"])]);

        a.merge(&b);
        assert_eq!(a.artist_counts["Air"], 2);
        assert_eq!(a.track_counts["t1"], 2);
        assert_eq!(a.artist_counts["Moby"], 1);
    }

    #[test]
    fn empty_record_is_a_no_op() {
        let mut taste = UserTaste::default();
        taste.record_tracks(&[]);
        assert!(taste.is_empty());
        assert!(taste.updated_at.is_none());
    }
}
