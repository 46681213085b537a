//! Playback-policy bridge
//!
//! Platforms refuse to start audio until the user has interacted with the
//! application. The bridge records the first qualifying interaction and hands
//! out [`PlayTrigger`]s that any caller can hold to request playback. Triggers
//! stop working once the bridge is torn down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::{lock_output, OutputConfig, PlayRejection, SharedControl};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    KeyPress,
    Click,
    Focus,
    Scroll,
}

impl Interaction {
    pub fn is_qualifying(self) -> bool {
        matches!(self, Interaction::KeyPress | Interaction::Click)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    AlreadyPlaying,
}

struct BridgeInner {
    output: SharedControl,
    gesture_captured: AtomicBool,
}

pub struct GestureBridge {
    inner: Arc<BridgeInner>,
}

impl GestureBridge {
    /// Configures the handle for unmuted remote streaming and mounts the bridge.
    pub fn mount(output: SharedControl) -> Self {
        lock_output(&output).configure(OutputConfig::for_remote_stream());
        tracing::debug!("Gesture bridge mounted");
        Self {
            inner: Arc::new(BridgeInner {
                output,
                gesture_captured: AtomicBool::new(false),
            }),
        }
    }

    pub fn trigger(&self) -> PlayTrigger {
        PlayTrigger {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn gesture_captured(&self) -> bool {
        self.inner.gesture_captured.load(Ordering::Acquire)
    }

    /// Unmounts the bridge; every trigger handed out becomes inert.
    pub fn teardown(self) {
        tracing::debug!(gesture_captured = self.gesture_captured(), "Gesture bridge torn down");
    }
}

/// Caller-held handle for requesting playback
#[derive(Clone)]
pub struct PlayTrigger {
    inner: Weak<BridgeInner>,
}

impl PlayTrigger {
    pub fn is_available(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Returns true when this was the first qualifying interaction.
    pub fn note_interaction(&self, interaction: Interaction) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        if !interaction.is_qualifying() {
            return false;
        }
        let first = !inner.gesture_captured.swap(true, Ordering::AcqRel);
        if first {
            tracing::info!(?interaction, "User gesture captured, playback unlocked");
        }
        first
    }

    /// Asks the handle to start playback. Calling it while already playing is a no-op.
    pub fn trigger_play(&self) -> Result<PlayOutcome, PlayRejection> {
        let Some(inner) = self.inner.upgrade() else {
            tracing::warn!("Play requested after the gesture bridge was torn down");
            return Err(PlayRejection::Unmounted);
        };
        if !inner.gesture_captured.load(Ordering::Acquire) {
            tracing::warn!(reason = %PlayRejection::NotAllowed, "Play rejected");
            return Err(PlayRejection::NotAllowed);
        }

        let mut output = lock_output(&inner.output);
        if output.is_playing() {
            return Ok(PlayOutcome::AlreadyPlaying);
        }
        if output.source().is_none() {
            tracing::warn!(reason = %PlayRejection::NoSource, "Play rejected");
            return Err(PlayRejection::NoSource);
        }
        match output.play() {
            Ok(()) => Ok(PlayOutcome::Started),
            Err(e) => {
                tracing::warn!(reason = %e, "Play rejected");
                Err(e)
            }
        }
    }

    pub fn pause(&self) -> Result<(), PlayRejection> {
        let inner = self.inner.upgrade().ok_or(PlayRejection::Unmounted)?;
        lock_output(&inner.output).pause();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake;

    #[test]
    fn trigger_is_available_after_mount_and_removed_on_teardown() {
        let (_fake, output) = fake::control();
        let bridge = GestureBridge::mount(output);
        let trigger = bridge.trigger();
        assert!(trigger.is_available());

        bridge.teardown();
        assert!(!trigger.is_available());
        assert_eq!(trigger.trigger_play(), Err(PlayRejection::Unmounted));
    }

    #[test]
    fn configures_handle_once_unmuted() {
        let (fake, output) = fake::control();
        let bridge = GestureBridge::mount(output);
        let _second = bridge.trigger();
        let _third = bridge.trigger();
        assert_eq!(fake.lock().unwrap().calls, ["configure muted=false"]);
    }

    #[test]
    fn play_needs_a_qualifying_gesture() {
        let (fake, output) = fake::control();
        fake.lock().unwrap().source = Some("/stream/1".to_string());
        let bridge = GestureBridge::mount(output);
        let trigger = bridge.trigger();

        assert_eq!(trigger.trigger_play(), Err(PlayRejection::NotAllowed));
        assert!(!trigger.note_interaction(Interaction::Scroll));
        assert!(trigger.note_interaction(Interaction::KeyPress));
        assert!(!trigger.note_interaction(Interaction::Click));
        assert!(bridge.gesture_captured());

        assert_eq!(trigger.trigger_play(), Ok(PlayOutcome::Started));
        assert_eq!(trigger.trigger_play(), Ok(PlayOutcome::AlreadyPlaying));

        let calls = fake.lock().unwrap().calls.clone();
        assert_eq!(calls.iter().filter(|c| *c == "play").count(), 1);
        assert!(!calls.iter().any(|c| c == "pause"));
    }

    #[test]
    fn rejection_leaves_state_unchanged() {
        let (fake, output) = fake::control();
        {
            let mut fake = fake.lock().unwrap();
            fake.source = Some("/stream/1".to_string());
            fake.reject_play = true;
        }
        let bridge = GestureBridge::mount(output);
        let trigger = bridge.trigger();
        trigger.note_interaction(Interaction::Click);

        assert!(matches!(trigger.trigger_play(), Err(PlayRejection::Output(_))));
        assert!(!fake.lock().unwrap().playing);
    }

    #[test]
    fn play_without_source_is_rejected() {
        let (_fake, output) = fake::control();
        let bridge = GestureBridge::mount(output);
        let trigger = bridge.trigger();
        trigger.note_interaction(Interaction::KeyPress);
        assert_eq!(trigger.trigger_play(), Err(PlayRejection::NoSource));
    }
}
