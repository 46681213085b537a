//! Core type definitions for the application

use std::time::Instant;
use serde::{Deserialize, Serialize};

/// Backend-assigned track identity
pub type TrackId = u64;

/// A playable track as described by the backend.
///
/// Tracks are never edited once received; collections replace them wholesale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Duration in seconds
    #[serde(default, rename = "duration")]
    pub duration_secs: u32,
    #[serde(default, rename = "artwork")]
    pub artwork_url: Option<String>,
}

/// Repeat mode state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RepeatMode::Off => "Off",
            RepeatMode::All => "All",
            RepeatMode::One => "One",
        }
    }
}

/// Which pane of the UI is currently active/focused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ActivePane {
    #[default]
    Queue,
    Library,
    Suggestions,
}

impl ActivePane {
    pub fn next(self) -> Self {
        match self {
            ActivePane::Queue => ActivePane::Library,
            ActivePane::Library => ActivePane::Suggestions,
            ActivePane::Suggestions => ActivePane::Queue,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActivePane::Queue => ActivePane::Suggestions,
            ActivePane::Library => ActivePane::Queue,
            ActivePane::Suggestions => ActivePane::Library,
        }
    }
}

/// UI state for the application
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub active_pane: ActivePane,
    pub queue_selected: usize,
    pub library_selected: usize,
    pub suggestion_selected: usize,
    pub error_message: Option<String>,
    pub error_timestamp: Option<Instant>,
    pub show_help_popup: bool,
}

impl UiState {
    pub fn selected_mut(&mut self) -> &mut usize {
        match self.active_pane {
            ActivePane::Queue => &mut self.queue_selected,
            ActivePane::Library => &mut self.library_selected,
            ActivePane::Suggestions => &mut self.suggestion_selected,
        }
    }
}
