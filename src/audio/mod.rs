//! Audio output module
//!
//! The single audio-output handle is shared between two owners with disjoint
//! rights, and each is only handed the trait it needs:
//!
//! - `binder`: the only writer of the handle's source locator ([`AudioOutput`])
//! - `gesture`: configures the handle once and issues play/pause requests
//!   ([`PlaybackControl`])
//! - `output`: the shipped HTTP-backed handle

pub mod binder;
pub mod gesture;
mod output;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub use binder::{AudioResourceBinding, BindingStatus, PlaybackResourceBinder};
pub use gesture::{GestureBridge, Interaction, PlayOutcome, PlayTrigger};
pub use output::StreamOutput;

/// Identifies one `set_source` + `load` cycle on the handle
pub type Generation = u64;

/// Handle settings applied once when the gesture bridge mounts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub muted: bool,
    pub cross_origin: bool,
    pub inline_playback: bool,
    /// Read the first bytes of the stream on load rather than just its headers
    pub eager_preload: bool,
}

impl OutputConfig {
    pub fn for_remote_stream() -> Self {
        Self {
            muted: false,
            cross_origin: true,
            inline_playback: true,
            eager_preload: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaErrorKind {
    Aborted,
    Network,
    Decode,
    UnsupportedFormat,
    Unknown,
}

impl fmt::Display for MediaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaErrorKind::Aborted => write!(f, "Playback aborted"),
            MediaErrorKind::Network => write!(f, "Network error while loading the stream"),
            MediaErrorKind::Decode => write!(f, "The stream could not be decoded"),
            MediaErrorKind::UnsupportedFormat => write!(f, "Unsupported stream format"),
            MediaErrorKind::Unknown => write!(f, "Unknown playback error"),
        }
    }
}

/// Signals raised by the handle, tagged with the load they belong to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputEvent {
    CanPlay { generation: Generation },
    PlayStarted { generation: Generation },
    Paused { generation: Generation },
    Error { generation: Generation, kind: MediaErrorKind },
}

impl OutputEvent {
    pub fn generation(&self) -> Generation {
        match self {
            OutputEvent::CanPlay { generation }
            | OutputEvent::PlayStarted { generation }
            | OutputEvent::Paused { generation }
            | OutputEvent::Error { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayRejection {
    #[error("playback is not allowed before the first user interaction")]
    NotAllowed,
    #[error("no stream is loaded")]
    NoSource,
    #[error("audio output is no longer mounted")]
    Unmounted,
    #[error("audio output refused to play: {0}")]
    Output(String),
}

/// The play/pause side of the platform audio-output handle. It can read the
/// source but never change it.
pub trait PlaybackControl: Send {
    fn configure(&mut self, config: OutputConfig);
    fn source(&self) -> Option<&str>;
    fn play(&mut self) -> Result<(), PlayRejection>;
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
}

/// The platform audio-output handle.
///
/// Implementations must not block; results of `load` and `play` arrive later
/// as [`OutputEvent`]s.
pub trait AudioOutput: PlaybackControl {
    fn set_source(&mut self, locator: &str, generation: Generation);
    fn clear_source(&mut self);
    fn load(&mut self);
}

pub type SharedOutput = Arc<Mutex<dyn AudioOutput>>;
pub type SharedControl = Arc<Mutex<dyn PlaybackControl>>;

/// Locks the handle, ignoring poisoning.
pub(crate) fn lock_output<T: ?Sized>(output: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    output.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Two views of one handle: the full one for the binder, play/pause for the bridge.
pub fn split_handle<T: AudioOutput + 'static>(output: T) -> (SharedOutput, SharedControl) {
    let output = Arc::new(Mutex::new(output));
    let full: SharedOutput = output.clone();
    let control: SharedControl = output;
    (full, control)
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// Records every call so tests can assert on ordering
    #[derive(Default)]
    pub struct FakeOutput {
        pub calls: Vec<String>,
        pub source: Option<String>,
        pub generation: Generation,
        pub playing: bool,
        pub reject_play: bool,
    }

    impl AudioOutput for FakeOutput {
        fn set_source(&mut self, locator: &str, generation: Generation) {
            self.calls.push(format!("set_source {locator}"));
            self.source = Some(locator.to_string());
            self.generation = generation;
        }

        fn clear_source(&mut self) {
            self.calls.push("clear_source".to_string());
            self.source = None;
            self.playing = false;
        }

        fn load(&mut self) {
            self.calls.push("load".to_string());
        }
    }

    impl PlaybackControl for FakeOutput {
        fn configure(&mut self, config: OutputConfig) {
            self.calls.push(format!("configure muted={}", config.muted));
        }

        fn source(&self) -> Option<&str> {
            self.source.as_deref()
        }

        fn play(&mut self) -> Result<(), PlayRejection> {
            self.calls.push("play".to_string());
            if self.reject_play {
                return Err(PlayRejection::Output("blocked".to_string()));
            }
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) {
            self.calls.push("pause".to_string());
            self.playing = false;
        }

        fn is_playing(&self) -> bool {
            self.playing
        }
    }

    pub fn shared() -> (Arc<Mutex<FakeOutput>>, SharedOutput) {
        let fake = Arc::new(Mutex::new(FakeOutput::default()));
        let shared: SharedOutput = fake.clone();
        (fake, shared)
    }

    pub fn control() -> (Arc<Mutex<FakeOutput>>, SharedControl) {
        let fake = Arc::new(Mutex::new(FakeOutput::default()));
        let control: SharedControl = fake.clone();
        (fake, control)
    }
}
