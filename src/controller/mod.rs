//! Controller module - Application logic and event handling
//!
//! This module contains the application controller that handles user input,
//! coordinates between the model and the backend, and drives the three
//! writers of the playback session.
//! It is organized into submodules by responsibility:
//!
//! - `input`: Key event handling
//! - `bootstrap`: One-shot status pull at startup
//! - `channel`: Push channel listener
//! - `queue`: Optimistic queue mutations
//! - `playback`: Play/pause and enhancement controls
//! - `navigation`: Library paging
//! - `player_events`: Reacts to audio binding changes (history, errors)

mod input;
mod bootstrap;
mod channel;
mod queue;
mod playback;
mod navigation;
mod player_events;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::audio::PlayTrigger;
use crate::config::Config;
use crate::model::{AppModel, LibrarySource, QueueBackend, QueueError, ServiceClient, StatusSource};

/// The backend seams the controller talks through
#[derive(Clone)]
pub struct Backends {
    pub status: Arc<dyn StatusSource>,
    pub queue: Arc<dyn QueueBackend>,
    pub library: Arc<dyn LibrarySource>,
}

impl Backends {
    pub fn from_client(client: ServiceClient) -> Self {
        let client = Arc::new(client);
        Self {
            status: client.clone(),
            queue: client.clone(),
            library: client,
        }
    }
}

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<AppModel>,
    backends: Backends,
    trigger: PlayTrigger,
    /// Held for the whole begin → send → settle cycle of a queue mutation
    mutation_gate: Arc<Mutex<()>>,
    presets: Arc<[String]>,
    page_size: usize,
}

impl AppController {
    pub fn new(model: Arc<AppModel>, backends: Backends, trigger: PlayTrigger, config: &Config) -> Self {
        Self {
            model,
            backends,
            trigger,
            mutation_gate: Arc::new(Mutex::new(())),
            presets: config.enhancement.presets.clone().into(),
            page_size: config.library.page_size,
        }
    }

    pub(crate) fn format_error(error: &anyhow::Error) -> String {
        if let Some(queue_error) = error.downcast_ref::<QueueError>() {
            return match queue_error {
                QueueError::MutationInFlight => "Another queue change is still being confirmed.".to_string(),
                other => format!("Queue: {}", other),
            };
        }

        let error_str = error.to_string();

        if error_str.contains("409") {
            "The server rejected the queue change. Your queue was restored.".to_string()
        } else if error_str.contains("404") {
            "The server does not know that track.".to_string()
        } else if error_str.contains("503") {
            "The music server is busy. Try again in a moment.".to_string()
        } else if error_str.contains("error sending request") || error_str.contains("timed out") {
            "Cannot reach the music server. Check the [server] section of remaster.toml.".to_string()
        } else {
            format!("Error: {}", error_str)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    use anyhow::{bail, Result};
    use futures::future::BoxFuture;
    use tokio::sync::{watch, Notify};

    use super::*;
    use crate::audio::fake::{self, FakeOutput};
    use crate::audio::{AudioResourceBinding, GestureBridge};
    use crate::model::{Enhancement, LibraryPage, PlayerState, QueueCommand, Track, TrackId};

    /// In-memory stand-in for every backend seam
    #[derive(Default)]
    pub struct FakeBackend {
        /// `None` makes the status pull fail
        pub status: StdMutex<Option<PlayerState>>,
        pub sent: StdMutex<Vec<QueueCommand>>,
        pub reject_commands: AtomicBool,
        /// When set, each command waits for a notification before answering
        pub hold_commands: Option<Arc<Notify>>,
        pub library: Vec<Track>,
    }

    impl FakeBackend {
        pub fn rejecting(&self, reject: bool) {
            self.reject_commands.store(reject, Ordering::SeqCst);
        }

        pub fn sent(&self) -> Vec<QueueCommand> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl StatusSource for FakeBackend {
        fn fetch_status(&self) -> BoxFuture<'_, Result<PlayerState>> {
            Box::pin(async move {
                match self.status.lock().unwrap().clone() {
                    Some(state) => Ok(state),
                    None => bail!("error sending request for url (http://127.0.0.1:8080/status)"),
                }
            })
        }
    }

    impl QueueBackend for FakeBackend {
        fn send_command<'a>(&'a self, command: &'a QueueCommand) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                if let Some(hold) = &self.hold_commands {
                    hold.notified().await;
                }
                self.sent.lock().unwrap().push(command.clone());
                if self.reject_commands.load(Ordering::SeqCst) {
                    bail!("HTTP status client error (409 Conflict)");
                }
                Ok(())
            })
        }
    }

    impl LibrarySource for FakeBackend {
        fn fetch_library_page(&self, offset: usize, limit: usize) -> BoxFuture<'_, Result<LibraryPage>> {
            Box::pin(async move {
                let tracks: Vec<Track> = self.library.iter().skip(offset).take(limit).cloned().collect();
                Ok(LibraryPage {
                    has_more: offset + tracks.len() < self.library.len(),
                    tracks,
                })
            })
        }
    }

    pub fn track(id: TrackId) -> Track {
        Track {
            id,
            title: format!("Track {id}"),
            artist: format!("Artist {}", id % 3),
            album: None,
            duration_secs: 200,
            artwork_url: None,
        }
    }

    /// Everything a controller test needs kept alive
    pub struct Harness {
        pub controller: AppController,
        pub backend: Arc<FakeBackend>,
        pub bridge: GestureBridge,
        pub output: Arc<StdMutex<FakeOutput>>,
        pub binding_tx: watch::Sender<AudioResourceBinding>,
    }

    pub fn harness(backend: FakeBackend) -> Harness {
        let backend = Arc::new(backend);
        let (binding_tx, binding_rx) = watch::channel(AudioResourceBinding::default());
        let model = Arc::new(AppModel::new(Enhancement::default(), binding_rx));
        let (output, control) = fake::control();
        let bridge = GestureBridge::mount(control);
        let backends = Backends {
            status: backend.clone(),
            queue: backend.clone(),
            library: backend.clone(),
        };
        let mut config = Config::default();
        config.library.page_size = 2;
        let controller = AppController::new(model, backends, bridge.trigger(), &config);
        Harness { controller, backend, bridge, output, binding_tx }
    }

    #[test]
    fn format_error_maps_common_failures() {
        let conflict = anyhow::anyhow!("HTTP status client error (409 Conflict)");
        assert!(AppController::format_error(&conflict).contains("restored"));

        let busy = anyhow::Error::new(QueueError::MutationInFlight);
        assert_eq!(
            AppController::format_error(&busy),
            "Another queue change is still being confirmed."
        );

        let other = anyhow::anyhow!("boom");
        assert_eq!(AppController::format_error(&other), "Error: boom");
    }
}
