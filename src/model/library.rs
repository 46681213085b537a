//! Paginated library browsing

use std::collections::HashSet;
use serde::Deserialize;

use super::types::{Track, TrackId};

/// One page of `GET /library/tracks`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LibraryPage {
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub has_more: bool,
}

/// Appends `page` to `held`, skipping any track id already present.
/// Returns how many tracks were actually added.
pub fn merge_page(held: &mut Vec<Track>, page: Vec<Track>) -> usize {
    let mut seen: HashSet<TrackId> = held.iter().map(|t| t.id).collect();
    let before = held.len();
    held.extend(page.into_iter().filter(|t| seen.insert(t.id)));
    held.len() - before
}

/// Library tracks loaded so far
#[derive(Clone, Debug, Default)]
pub struct LibraryBrowser {
    pub tracks: Vec<Track>,
    pub next_offset: usize,
    pub has_more: bool,
    pub loading_more: bool,
    pub loaded_once: bool,
}

impl LibraryBrowser {
    pub fn can_load_more(&self) -> bool {
        !self.loading_more && (self.has_more || !self.loaded_once)
    }

    pub fn append_page(&mut self, page: LibraryPage) -> usize {
        // The offset advances by what the server returned, not by what survived dedup
        self.next_offset += page.tracks.len();
        self.has_more = page.has_more;
        self.loading_more = false;
        self.loaded_once = true;
        merge_page(&mut self.tracks, page.tracks)
    }
}
