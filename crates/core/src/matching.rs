//! Fuzzy resolution of user phrases to events and catalogue items
//!
//! Everything here is a linear scan with a trivial score: bag-of-words
//! overlap for subjects, exact address intersection for participants, and
//! a fixed preference order for music search results.

use std::collections::HashSet;

use actionarc_domain::{Album, Artist, CalendarEvent, Track};

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "at", "by", "for", "from", "in", "is", "it", "my", "of", "on", "or", "the",
    "to", "with",
];

/// Lowercase alphanumeric words with stop-words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Number of distinct tokens shared by `a` and `b`.
pub fn overlap_score(a: &str, b: &str) -> usize {
    let left: HashSet<String> = tokenize(a).into_iter().collect();
    let right: HashSet<String> = tokenize(b).into_iter().collect();
    left.intersection(&right).count()
}

/// Events with a non-zero subject overlap, best first, earliest start on ties.
pub fn rank_events_by_subject<'a>(
    events: impl IntoIterator<Item = &'a CalendarEvent>,
    query: &str,
) -> Vec<(&'a CalendarEvent, usize)> {
    let mut scored: Vec<_> = events
        .into_iter()
        .map(|e| (e, overlap_score(&e.subject, query)))
        .filter(|(_, score)| *score > 0)
        .collect();
    scored.sort_by(|(a, sa), (b, sb)| sb.cmp(sa).then(a.start.cmp(&b.start)));
    scored
}

/// Argmax of subject overlap; `None` when nothing shares a token.
pub fn best_event_by_subject<'a>(
    events: impl IntoIterator<Item = &'a CalendarEvent>,
    query: &str,
) -> Option<&'a CalendarEvent> {
    rank_events_by_subject(events, query).into_iter().next().map(|(e, _)| e)
}

fn participant_hits(event: &CalendarEvent, wanted: &HashSet<String>) -> usize {
    event.participant_addresses().iter().filter(|a| wanted.contains(*a)).count()
}

/// Events sharing at least one address with `participants`, most shared first.
pub fn rank_events_by_participants<'a>(
    events: impl IntoIterator<Item = &'a CalendarEvent>,
    participants: &[String],
) -> Vec<(&'a CalendarEvent, usize)> {
    let wanted: HashSet<String> = participants.iter().map(|p| p.trim().to_lowercase()).collect();
    let mut scored: Vec<_> = events
        .into_iter()
        .map(|e| (e, participant_hits(e, &wanted)))
        .filter(|(_, hits)| *hits > 0)
        .collect();
    scored.sort_by(|(a, sa), (b, sb)| sb.cmp(sa).then(a.start.cmp(&b.start)));
    scored
}

/// Argmax of exact, case-insensitive address intersection; `None` when zero.
pub fn best_event_by_participants<'a>(
    events: impl IntoIterator<Item = &'a CalendarEvent>,
    participants: &[String],
) -> Option<&'a CalendarEvent> {
    rank_events_by_participants(events, participants).into_iter().next().map(|(e, _)| e)
}

/// Case-insensitive name equality, Unicode-aware.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn any_known(artists: &[String], known: &HashSet<String>) -> bool {
    artists.iter().any(|a| known.contains(&a.to_lowercase()))
}

/// Picks the max by key, keeping the earliest candidate on ties.
fn pick<'a, T, K: Ord>(candidates: &'a [T], key: impl Fn(&T) -> K) -> Option<&'a T> {
    candidates.iter().rev().max_by_key(|c| key(c))
}

/// Exact name match, then an artist the user already listens to, then
/// popularity. `known_artists` holds lowercase names.
pub fn select_best_track<'a>(
    candidates: &'a [Track],
    query: &str,
    known_artists: &HashSet<String>,
) -> Option<&'a Track> {
    pick(candidates, |t| {
        (same_name(&t.name, query), any_known(&t.artists, known_artists), t.popularity)
    })
}

pub fn select_best_album<'a>(
    candidates: &'a [Album],
    query: &str,
    known_artists: &HashSet<String>,
) -> Option<&'a Album> {
    pick(candidates, |a| {
        (same_name(&a.name, query), any_known(&a.artists, known_artists), a.popularity)
    })
}

pub fn select_best_artist<'a>(
    candidates: &'a [Artist],
    query: &str,
    known_artists: &HashSet<String>,
) -> Option<&'a Artist> {
    pick(candidates, |a| {
        (same_name(&a.name, query), known_artists.contains(&a.name.to_lowercase()), a.popularity)
    })
}

#[cfg(test)]
mod tests {
    use actionarc_domain::Attendee;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn event(id: &str, subject: &str, day: u32, attendees: &[&str]) -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2025, 4, day, 10, 0, 0).unwrap();
        CalendarEvent {
            id: id.into(),
            subject: subject.into(),
            body: None,
            start,
            end: start + chrono::Duration::hours(1),
            is_all_day: false,
            location: None,
            attendees: attendees.iter().map(|a| Attendee::new(*a)).collect(),
            organizer: None,
            web_link: None,
        }
    }

    fn track(name: &str, artist: &str, popularity: u32) -> Track {
        Track {
            id: format!("{name}-{artist}"),
            name: name.into(),
            uri: format!("spotify:track:{name}-{artist}"),
            artists: vec![artist.into()],
            album: None,
            duration_ms: 0,
            popularity,
        }
    }

    #[test]
    fn tokenize_drops_stop_words_and_punctuation() {
        assert_eq!(tokenize("Review of the Q3 budget, with Finance!"), vec![
            "review", "q3", "budget", "finance"
        ]);
        assert!(tokenize("the of and").is_empty());
    }

    #[test]
    fn overlap_counts_distinct_tokens() {
        assert_eq!(overlap_score("budget budget review", "Budget review meeting"), 2);
        assert_eq!(overlap_score("lunch", "dinner"), 0);
    }

    #[test]
    fn subject_match_prefers_score_then_earliest_start() {
        let events = vec![
            event("late", "Budget review", 9, &[]),
            event("early", "Budget review", 2, &[]),
            event("weak", "Budget", 1, &[]),
        ];
        let best = best_event_by_subject(&events, "review the budget").unwrap();
        assert_eq!(best.id, "early");
    }

    #[test]
    fn subject_match_returns_none_without_overlap() {
        let events = vec![event("e", "Standup", 1, &[])];
        assert!(best_event_by_subject(&events, "dentist").is_none());
    }

    #[test]
    fn participant_match_is_exact_and_case_insensitive() {
        let events = vec![
            event("one", "Sync", 1, &["Bob@Example.com"]),
            event("two", "Sync", 2, &["bob@example.com", "carol@example.com"]),
            event("none", "Sync", 3, &["bobby@example.com"]),
        ];
        let wanted = vec!["BOB@example.com".to_string(), "carol@example.com".to_string()];
        assert_eq!(best_event_by_participants(&events, &wanted).unwrap().id, "two");

        let nobody = vec!["dave@example.com".to_string()];
        assert!(best_event_by_participants(&events, &nobody).is_none());
    }

    #[test]
    fn track_selection_order() {
        let known: HashSet<String> = ["radiohead".to_string()].into_iter().collect();

        // exact name beats everything else
        let candidates = vec![
            track("Creep (Acoustic)", "Radiohead", 90),
            track("Creep", "Stone Temple Pilots", 40),
        ];
        assert_eq!(select_best_track(&candidates, "creep", &known).unwrap().artists[0], "Stone Temple Pilots");

        // then known artist
        let candidates = vec![track("Creep", "Cover Band", 80), track("Creep", "Radiohead", 30)];
        assert_eq!(select_best_track(&candidates, "Creep", &known).unwrap().artists[0], "Radiohead");

        // then popularity, earliest on a full tie
        let candidates = vec![track("Creep", "A", 10), track("Creep", "B", 50), track("Creep", "C", 50)];
        assert_eq!(select_best_track(&candidates, "Creep", &HashSet::new()).unwrap().artists[0], "B");

        assert!(select_best_track(&[], "x", &known).is_none());
    }

    #[test]
    fn exact_name_match_folds_non_ascii_case() {
        assert!(same_name(" Beyoncé ", "BEYONCÉ"));
        assert!(!same_name("Beyoncé", "Beyonce"));

        let candidates = vec![track("Déjà Vu (Remix)", "Other", 90), track("Déjà Vu", "Beyoncé", 20)];
        assert_eq!(select_best_track(&candidates, "DÉJÀ VU", &HashSet::new()).unwrap().artists[0], "Beyoncé");
    }

    #[test]
    fn artist_selection_uses_known_names() {
        let artist = |name: &str, popularity| Artist {
            id: name.into(),
            name: name.into(),
            uri: format!("spotify:artist:{name}"),
            popularity,
            genres: vec![],
        };
        let known: HashSet<String> = ["the national".to_string()].into_iter().collect();
        let candidates = vec![artist("National Sweetheart", 70), artist("The National", 60)];
        assert_eq!(select_best_artist(&candidates, "national", &known).unwrap().name, "The National");
    }
}
