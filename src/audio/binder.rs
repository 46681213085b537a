//! Keeps the audio handle's source in step with the playback session
//!
//! The locator is a projection of (track id, enhancement). Whenever that pair
//! changes the binder writes the new locator and reloads the handle, always in
//! that order. Events from a load that has since been superseded are dropped
//! by comparing generations.

use tokio::sync::{mpsc, watch};

use super::{lock_output, Generation, MediaErrorKind, OutputEvent, SharedOutput};
use crate::model::{Enhancement, PlaybackSession, SourceKey, TrackId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BindingStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Error,
}

impl BindingStatus {
    pub fn label(self) -> &'static str {
        match self {
            BindingStatus::Idle => "idle",
            BindingStatus::Loading => "loading",
            BindingStatus::Ready => "ready",
            BindingStatus::Playing => "playing",
            BindingStatus::Error => "error",
        }
    }
}

/// What the handle currently points at
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioResourceBinding {
    pub locator: Option<String>,
    pub status: BindingStatus,
    pub track_id: Option<TrackId>,
    pub error: Option<MediaErrorKind>,
}

/// `/stream/{id}`, with mastering parameters only when enhancement is on.
pub fn stream_locator(track_id: TrackId, enhancement: &Enhancement) -> String {
    if enhancement.enabled {
        format!(
            "/stream/{}?enhanced=true&preset={}&intensity={}",
            track_id,
            urlencoding::encode(&enhancement.preset),
            enhancement.intensity
        )
    } else {
        format!("/stream/{track_id}")
    }
}

pub struct PlaybackResourceBinder {
    output: SharedOutput,
    bound: Option<SourceKey>,
    generation: Generation,
    binding: AudioResourceBinding,
    resume_when_ready: bool,
}

impl PlaybackResourceBinder {
    pub fn new(output: SharedOutput) -> Self {
        Self {
            output,
            bound: None,
            generation: 0,
            binding: AudioResourceBinding::default(),
            resume_when_ready: false,
        }
    }

    pub fn binding(&self) -> &AudioResourceBinding {
        &self.binding
    }

    /// Rebinds the handle if the session's source pair differs from the bound one.
    /// Returns whether the binding changed.
    pub fn sync(&mut self, session: &PlaybackSession) -> bool {
        let key = session.source_key();
        if key == self.bound {
            return false;
        }

        let Some(key) = key else {
            tracing::debug!("Session has no track, releasing audio source");
            lock_output(&self.output).clear_source();
            self.bound = None;
            self.resume_when_ready = false;
            self.binding = AudioResourceBinding::default();
            return true;
        };

        let was_playing = self.binding.status == BindingStatus::Playing;
        self.generation += 1;
        let locator = stream_locator(key.track_id, &key.enhancement);
        {
            let mut output = lock_output(&self.output);
            output.set_source(&locator, self.generation);
            output.load();
        }
        tracing::debug!(
            track_id = key.track_id,
            locator = %locator,
            generation = self.generation,
            was_playing,
            "Audio source bound"
        );

        self.binding = AudioResourceBinding {
            locator: Some(locator),
            status: BindingStatus::Loading,
            track_id: Some(key.track_id),
            error: None,
        };
        self.bound = Some(key);
        self.resume_when_ready = was_playing;
        true
    }

    /// Advances the status machine. Returns whether the binding changed.
    pub fn handle_event(&mut self, event: OutputEvent) -> bool {
        if self.bound.is_none() || event.generation() != self.generation {
            tracing::trace!(?event, current = self.generation, "Ignoring event from superseded load");
            return false;
        }

        let next = match (self.binding.status, event) {
            (BindingStatus::Loading, OutputEvent::CanPlay { .. }) => BindingStatus::Ready,
            (BindingStatus::Loading | BindingStatus::Ready, OutputEvent::PlayStarted { .. }) => {
                self.resume_when_ready = false;
                BindingStatus::Playing
            }
            (BindingStatus::Playing, OutputEvent::Paused { .. }) => BindingStatus::Ready,
            (_, OutputEvent::Error { kind, .. }) => {
                tracing::warn!(
                    reason = %kind,
                    locator = ?self.binding.locator,
                    "Audio output error"
                );
                self.binding.error = Some(kind);
                self.resume_when_ready = false;
                BindingStatus::Error
            }
            (status, _) => status,
        };

        if next == BindingStatus::Ready && self.resume_when_ready {
            self.resume_when_ready = false;
            // The quality tier or track changed mid-playback; carry playback over
            if let Err(e) = lock_output(&self.output).play() {
                tracing::warn!(error = %e, "Could not resume playback after source change");
            }
        }

        if next == self.binding.status {
            return false;
        }
        tracing::debug!(from = self.binding.status.label(), to = next.label(), "Binding status changed");
        self.binding.status = next;
        true
    }

    /// Drives the binder until the session channel closes.
    pub async fn run(
        mut self,
        mut session_rx: watch::Receiver<PlaybackSession>,
        mut events: mpsc::UnboundedReceiver<OutputEvent>,
        binding_tx: watch::Sender<AudioResourceBinding>,
    ) {
        tracing::info!("Playback resource binder started");
        let initial = session_rx.borrow_and_update().clone();
        if self.sync(&initial) {
            binding_tx.send_replace(self.binding.clone());
        }

        loop {
            let changed = tokio::select! {
                result = session_rx.changed() => {
                    if result.is_err() {
                        break;
                    }
                    // Always the latest pair; intermediate sessions are never loaded
                    let session = session_rx.borrow_and_update().clone();
                    self.sync(&session)
                }
                Some(event) = events.recv() => self.handle_event(event),
            };
            if changed {
                binding_tx.send_replace(self.binding.clone());
            }
        }
        tracing::info!("Playback resource binder stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake;
    use crate::model::{StateUpdate, Track};

    fn session_with(track_id: Option<TrackId>, enhancement: Enhancement) -> PlaybackSession {
        let mut session = PlaybackSession::new(enhancement);
        session.apply(StateUpdate::Push {
            track: track_id.map(|id| Track {
                id,
                title: "Song".to_string(),
                artist: "Band".to_string(),
                album: None,
                duration_secs: 100,
                artwork_url: None,
            }),
            sequence: None,
        });
        session
    }

    #[test]
    fn locator_carries_enhancement_only_when_enabled() {
        let warm = Enhancement::new(true, "warm", 0.6);
        assert_eq!(stream_locator(42, &warm), "/stream/42?enhanced=true&preset=warm&intensity=0.6");

        let off = Enhancement { enabled: false, ..warm };
        assert_eq!(stream_locator(42, &off), "/stream/42");

        let spaced = Enhancement::new(true, "late night", 1.0);
        assert_eq!(stream_locator(7, &spaced), "/stream/7?enhanced=true&preset=late%20night&intensity=1");
    }

    #[test]
    fn enabling_enhancement_rebinds_with_source_before_load() {
        let (fake, output) = fake::shared();
        let mut binder = PlaybackResourceBinder::new(output);

        assert!(binder.sync(&session_with(Some(42), Enhancement::default())));
        assert!(binder.sync(&session_with(Some(42), Enhancement::new(true, "warm", 0.6))));

        let calls = fake.lock().unwrap().calls.clone();
        assert_eq!(
            calls,
            [
                "set_source /stream/42",
                "load",
                "set_source /stream/42?enhanced=true&preset=warm&intensity=0.6",
                "load"
            ]
        );
        assert_eq!(binder.binding().status, BindingStatus::Loading);
        assert_eq!(
            binder.binding().locator.as_deref(),
            Some("/stream/42?enhanced=true&preset=warm&intensity=0.6")
        );
    }

    #[test]
    fn unchanged_pair_does_not_reload() {
        let (fake, output) = fake::shared();
        let mut binder = PlaybackResourceBinder::new(output);
        let session = session_with(Some(1), Enhancement::default());
        binder.sync(&session);
        assert!(!binder.sync(&session));
        assert_eq!(fake.lock().unwrap().calls.len(), 2);
    }

    #[test]
    fn status_machine_and_stale_events() {
        let (_fake, output) = fake::shared();
        let mut binder = PlaybackResourceBinder::new(output);
        binder.sync(&session_with(Some(1), Enhancement::default()));
        binder.sync(&session_with(Some(2), Enhancement::default()));

        // Event from the first load is ignored
        assert!(!binder.handle_event(OutputEvent::CanPlay { generation: 1 }));
        assert_eq!(binder.binding().status, BindingStatus::Loading);

        assert!(binder.handle_event(OutputEvent::CanPlay { generation: 2 }));
        assert_eq!(binder.binding().status, BindingStatus::Ready);
        assert!(binder.handle_event(OutputEvent::PlayStarted { generation: 2 }));
        assert_eq!(binder.binding().status, BindingStatus::Playing);
        assert!(binder.binding().locator.is_some());

        assert!(binder.handle_event(OutputEvent::Error { generation: 2, kind: MediaErrorKind::Decode }));
        assert_eq!(binder.binding().status, BindingStatus::Error);
        assert_eq!(binder.binding().error, Some(MediaErrorKind::Decode));
    }

    #[test]
    fn empty_session_returns_to_idle() {
        let (fake, output) = fake::shared();
        let mut binder = PlaybackResourceBinder::new(output);
        binder.sync(&session_with(Some(1), Enhancement::default()));
        assert!(binder.sync(&session_with(None, Enhancement::default())));
        assert_eq!(binder.binding(), &AudioResourceBinding::default());
        assert_eq!(fake.lock().unwrap().source, None);
    }

    #[test]
    fn tier_switch_while_playing_resumes_once_ready() {
        let (fake, output) = fake::shared();
        let mut binder = PlaybackResourceBinder::new(output);
        binder.sync(&session_with(Some(5), Enhancement::default()));
        binder.handle_event(OutputEvent::PlayStarted { generation: 1 });

        binder.sync(&session_with(Some(5), Enhancement::new(true, "bright", 0.3)));
        binder.handle_event(OutputEvent::CanPlay { generation: 2 });

        let calls = fake.lock().unwrap().calls.clone();
        assert_eq!(calls.last().map(String::as_str), Some("play"));
        assert!(!calls.iter().any(|c| c == "pause"));
    }

    #[tokio::test]
    async fn run_loop_follows_latest_session() {
        let (_fake, output) = fake::shared();
        let binder = PlaybackResourceBinder::new(output);
        let (session_tx, session_rx) = watch::channel(PlaybackSession::default());
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (binding_tx, mut binding_rx) = watch::channel(AudioResourceBinding::default());

        let task = tokio::spawn(binder.run(session_rx, event_rx, binding_tx));

        session_tx.send_replace(session_with(Some(3), Enhancement::default()));
        session_tx.send_replace(session_with(Some(4), Enhancement::default()));
        binding_rx
            .wait_for(|b| b.track_id == Some(4))
            .await
            .unwrap();

        drop(session_tx);
        drop(event_tx);
        task.await.unwrap();
        assert_eq!(binding_rx.borrow().locator.as_deref(), Some("/stream/4"));
    }
}
