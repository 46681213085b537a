//! Authoritative playback session and the reducer that reconciles its writers
//!
//! Three writers compete for the "now playing" fact: the one-shot status pull,
//! the push channel, and local queue mutations. Every write is expressed as a
//! [`StateUpdate`] and goes through [`PlaybackSession::apply`], which is the
//! only place ordering decisions are made.

use serde::{Deserialize, Serialize};

use super::types::{RepeatMode, Track, TrackId};
use crate::audio::AudioResourceBinding;

pub const DEFAULT_PRESET: &str = "balanced";

/// Backend mastering tier requested for the stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    pub enabled: bool,
    pub preset: String,
    /// 0.0 - 1.0
    pub intensity: f64,
}

impl Default for Enhancement {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: DEFAULT_PRESET.to_string(),
            intensity: 0.5,
        }
    }
}

impl Enhancement {
    pub fn new(enabled: bool, preset: impl Into<String>, intensity: f64) -> Self {
        Self {
            enabled,
            preset: preset.into(),
            intensity: clamp_intensity(intensity),
        }
    }

    /// Returns a copy with the intensity moved by `delta`, kept within 0.0 - 1.0
    /// and rounded to one decimal so repeated nudges do not accumulate float noise.
    pub fn nudged(&self, delta: f64) -> Self {
        let intensity = ((self.intensity + delta) * 10.0).round() / 10.0;
        Self {
            intensity: clamp_intensity(intensity),
            ..self.clone()
        }
    }
}

pub fn clamp_intensity(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// The pair a stream locator is derived from
#[derive(Clone, Debug, PartialEq)]
pub struct SourceKey {
    pub track_id: TrackId,
    pub enhancement: Enhancement,
}

/// Why a local write changed the current track
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalCause {
    RemovedCurrent,
    Cleared,
    Selected,
}

/// A write against the session, tagged with where it came from
#[derive(Clone, Debug, PartialEq)]
pub enum StateUpdate {
    /// Result of the startup status pull
    Bootstrap { track: Option<Track>, sequence: Option<u64> },
    /// Delta from the push channel
    Push { track: Option<Track>, sequence: Option<u64> },
    /// Track change implied by a local queue mutation awaiting confirmation
    Local { track: Option<Track>, cause: LocalCause },
    /// Quality tier toggle
    Enhancement(Enhancement),
}

impl StateUpdate {
    pub fn source(&self) -> &'static str {
        match self {
            StateUpdate::Bootstrap { .. } => "bootstrap",
            StateUpdate::Push { .. } => "push",
            StateUpdate::Local { .. } => "local",
            StateUpdate::Enhancement(_) => "enhancement",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    /// Sequence is older than the last applied one
    Stale { sequence: u64, last_applied: u64 },
    /// An unsequenced bootstrap arrived after the channel already delivered state
    Superseded,
    /// Bootstrap named no current track
    NothingPlaying,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    Discarded(DiscardReason),
    /// Held back until the pending local mutation settles
    Deferred,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

/// How the pending local mutation ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldRelease {
    Confirmed,
    RolledBack,
}

#[derive(Clone, Debug, PartialEq)]
struct LocalHold {
    previous: Option<Track>,
    /// A remote update agreeing with the held track was applied during the hold
    remote_agreed: bool,
}

/// The single "now playing" fact
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackSession {
    current_track: Option<Track>,
    last_sequence: Option<u64>,
    remote_applied: bool,
    enhancement: Enhancement,
    hold: Option<LocalHold>,
    deferred: Option<StateUpdate>,
}

impl PlaybackSession {
    pub fn new(enhancement: Enhancement) -> Self {
        Self {
            enhancement,
            ..Default::default()
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn current_track_id(&self) -> Option<TrackId> {
        self.current_track.as_ref().map(|t| t.id)
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn enhancement(&self) -> &Enhancement {
        &self.enhancement
    }

    pub fn is_held(&self) -> bool {
        self.hold.is_some()
    }

    pub fn source_key(&self) -> Option<SourceKey> {
        self.current_track.as_ref().map(|track| SourceKey {
            track_id: track.id,
            enhancement: self.enhancement.clone(),
        })
    }

    /// Applies `update` if it is not older than what the session already holds.
    pub fn apply(&mut self, update: StateUpdate) -> UpdateOutcome {
        match update {
            StateUpdate::Enhancement(enhancement) => {
                self.enhancement = enhancement;
                UpdateOutcome::Applied
            }
            StateUpdate::Local { track, .. } => {
                if self.hold.is_none() {
                    self.hold = Some(LocalHold {
                        previous: self.current_track.clone(),
                        remote_agreed: false,
                    });
                }
                self.current_track = track;
                UpdateOutcome::Applied
            }
            StateUpdate::Bootstrap { ref track, sequence } => {
                if track.is_none() {
                    return UpdateOutcome::Discarded(DiscardReason::NothingPlaying);
                }
                if sequence.is_none() && self.remote_applied {
                    return UpdateOutcome::Discarded(DiscardReason::Superseded);
                }
                self.apply_remote(update.clone(), track.clone(), sequence)
            }
            StateUpdate::Push { ref track, sequence } => {
                self.apply_remote(update.clone(), track.clone(), sequence)
            }
        }
    }

    fn apply_remote(
        &mut self,
        update: StateUpdate,
        track: Option<Track>,
        sequence: Option<u64>,
    ) -> UpdateOutcome {
        if let (Some(sequence), Some(last_applied)) = (sequence, self.last_sequence) {
            if sequence < last_applied {
                return UpdateOutcome::Discarded(DiscardReason::Stale {
                    sequence,
                    last_applied,
                });
            }
        }

        let disagrees = track.as_ref().map(|t| t.id) != self.current_track_id();
        if self.hold.is_some() && disagrees {
            let newer = match (self.deferred_sequence(), sequence) {
                (Some(held), Some(incoming)) => incoming >= held,
                _ => true,
            };
            if newer {
                self.deferred = Some(update);
            }
            return UpdateOutcome::Deferred;
        }

        if let Some(hold) = self.hold.as_mut() {
            hold.remote_agreed = true;
        }
        self.current_track = track;
        if sequence.is_some() {
            self.last_sequence = sequence;
        }
        self.remote_applied = true;
        UpdateOutcome::Applied
    }

    fn deferred_sequence(&self) -> Option<u64> {
        match &self.deferred {
            Some(StateUpdate::Push { sequence, .. }) | Some(StateUpdate::Bootstrap { sequence, .. }) => *sequence,
            _ => None,
        }
    }

    /// Ends the local hold. A rollback restores the track that was current
    /// before the mutation unless the remote side has since confirmed the held
    /// track; any deferred remote update is then replayed.
    pub fn release_hold(&mut self, release: HoldRelease) -> Option<UpdateOutcome> {
        let hold = self.hold.take()?;
        if release == HoldRelease::RolledBack && !hold.remote_agreed {
            self.current_track = hold.previous;
        }
        self.deferred.take().map(|update| self.apply(update))
    }
}

/// Everything the now-playing bar renders
#[derive(Clone, Debug, Default)]
pub struct PlaybackInfo {
    pub track: Option<Track>,
    pub sequence: Option<u64>,
    pub awaiting_confirmation: bool,
    pub enhancement: Enhancement,
    pub binding: AudioResourceBinding,
    pub shuffled: bool,
    pub repeat_mode: RepeatMode,
}
