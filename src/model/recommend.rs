//! "Play next" suggestions derived from the queue and recent history

use std::collections::HashSet;

use super::queue::QueueState;
use super::types::{Track, TrackId};

pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct Suggestion {
    pub track: Track,
    pub reason: String,
    pub score: u32,
}

/// Ranks `candidates` against what is queued and playing.
///
/// Tracks already queued, currently playing or recently played are skipped.
pub fn rank_suggestions(
    queue: &QueueState,
    current: Option<&Track>,
    history: &[TrackId],
    candidates: &[Track],
) -> Vec<Suggestion> {
    let mut excluded: HashSet<TrackId> = queue.tracks().iter().map(|t| t.id).collect();
    excluded.extend(history.iter().copied());
    if let Some(track) = current {
        excluded.insert(track.id);
    }
    let queued_artists: HashSet<&str> = queue.tracks().iter().map(|t| t.artist.as_str()).collect();

    let mut suggestions: Vec<Suggestion> = candidates
        .iter()
        .filter(|candidate| excluded.insert(candidate.id))
        .map(|candidate| {
            let same_artist = current.is_some_and(|t| t.artist == candidate.artist);
            let same_album = current
                .and_then(|t| t.album.as_deref())
                .is_some_and(|album| candidate.album.as_deref() == Some(album));

            let (score, reason) = if same_album {
                (3, format!("From {}", candidate.album.as_deref().unwrap_or_default()))
            } else if same_artist {
                (2, format!("More from {}", candidate.artist))
            } else if queued_artists.contains(candidate.artist.as_str()) {
                (1, format!("Because {} is in your queue", candidate.artist))
            } else {
                (0, "From your library".to_string())
            };

            Suggestion { track: candidate.clone(), reason, score }
        })
        .collect();

    suggestions.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.track.title.cmp(&b.track.title)));
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}
