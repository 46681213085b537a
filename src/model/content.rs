//! Content pane state handed to the view: queue, library, suggestions and history

use chrono::{DateTime, Local};

use super::queue::QueueState;
use super::recommend::Suggestion;
use super::types::{Track, TrackId};

/// Number of played tracks remembered for suggestions
pub const HISTORY_LIMIT: usize = 50;

/// A track that reached the playing state
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub track_id: TrackId,
    pub title: String,
    pub artist: String,
    pub played_at: DateTime<Local>,
}

impl HistoryEntry {
    pub fn now(track: &Track) -> Self {
        Self {
            track_id: track.id,
            title: track.title.clone(),
            artist: track.artist.clone(),
            played_at: Local::now(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ContentState {
    pub queue: QueueState,
    pub queue_pending: bool,
    pub library: Vec<Track>,
    pub library_has_more: bool,
    pub library_loading: bool,
    pub suggestions: Vec<Suggestion>,
    /// Most recent first
    pub history: Vec<HistoryEntry>,
}
