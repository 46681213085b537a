//! Model module - Application state and data types
//!
//! This module contains all the data structures and state management for the application.
//! It is organized into submodules by responsibility:
//!
//! - `types`: Core type definitions (tracks, repeat mode, UI state)
//! - `playback`: The authoritative playback session and its update reducer
//! - `queue`: Play queue state and the optimistic mutation engine
//! - `library`: Paginated library browsing with dedup merge
//! - `recommend`: "Play next" suggestion ranking
//! - `content`: Snapshots handed to the view (queue, library, suggestions, history)
//! - `service_client`: HTTP client for the music backend and its trait seams
//! - `app_model`: Main application model with state management methods

mod types;
mod playback;
mod queue;
mod library;
mod recommend;
mod content;
mod service_client;
mod app_model;

// Re-export all public types for convenient access
pub use types::{ActivePane, RepeatMode, Track, TrackId, UiState};

pub use playback::{
    clamp_intensity, DiscardReason, Enhancement, HoldRelease, LocalCause, PlaybackInfo,
    PlaybackSession, SourceKey, StateUpdate, UpdateOutcome, DEFAULT_PRESET,
};

pub use queue::{MutationPhase, QueueCommand, QueueEntry, QueueError, QueueState, RemoteQueue};

pub use library::LibraryPage;

pub use content::ContentState;

pub use service_client::{LibrarySource, PlayerState, QueueBackend, ServiceClient, StatusSource};

pub use app_model::AppModel;
