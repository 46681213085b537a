//! Play queue state and the optimistic mutation engine
//!
//! Every queue edit is applied locally first and then confirmed or rolled back
//! once the backend answers. [`PendingMutation`] is the two-phase command that
//! carries the rollback snapshot; [`QueueEngine`] allows at most one of them at
//! a time so two unconfirmed edits never race over the same index space.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{RepeatMode, Track, TrackId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("index {index} is out of range for a queue of {len}")]
    OutOfRange { index: usize, len: usize },
    #[error("another queue change is still waiting for confirmation")]
    MutationInFlight,
    #[error("no pending queue change with id {0}")]
    UnknownMutation(u64),
}

/// A queue entry picked in the UI: the track plus where it was seen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueEntry {
    pub track_id: TrackId,
    pub index: usize,
}

/// Ordered play queue. `current_index` of `None` means nothing is current.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueState {
    tracks: Vec<Track>,
    current_index: Option<usize>,
    shuffled: bool,
    repeat_mode: RepeatMode,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from server data, dropping a current index that does not fit.
    pub fn from_parts(
        tracks: Vec<Track>,
        current_index: Option<usize>,
        shuffled: bool,
        repeat_mode: RepeatMode,
    ) -> Self {
        let current_index = current_index.filter(|&i| i < tracks.len());
        Self { tracks, current_index, shuffled, repeat_mode }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn entry_at(&self, index: usize) -> Option<QueueEntry> {
        self.tracks.get(index).map(|track| QueueEntry { track_id: track.id, index })
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.tracks.get(i))
    }

    pub fn shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    /// Index of the entry holding `track_id`, taking the one closest to `hint`
    /// when the track is queued more than once.
    pub fn position_near(&self, track_id: TrackId, hint: usize) -> Option<usize> {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.id == track_id)
            .min_by_key(|(i, _)| i.abs_diff(hint))
            .map(|(i, _)| i)
    }

    fn check_index(&self, index: usize) -> Result<(), QueueError> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(QueueError::OutOfRange { index, len: self.tracks.len() })
        }
    }

    pub fn append(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Track, QueueError> {
        self.check_index(index)?;
        let removed = self.tracks.remove(index);
        self.current_index = match self.current_index {
            Some(current) if index < current => Some(current - 1),
            // The following track takes over; past the tail we clamp to the new last entry
            Some(current) if index == current => {
                if self.tracks.is_empty() {
                    None
                } else {
                    Some(current.min(self.tracks.len() - 1))
                }
            }
            other => other,
        };
        Ok(removed)
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), QueueError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
        self.current_index = self.current_index.map(|current| {
            if current == from {
                to
            } else if from < current && current <= to {
                current - 1
            } else if to <= current && current < from {
                current + 1
            } else {
                current
            }
        });
        Ok(())
    }

    pub fn select(&mut self, index: usize) -> Result<(), QueueError> {
        self.check_index(index)?;
        self.current_index = Some(index);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current_index = None;
    }

    pub fn set_shuffled(&mut self, shuffled: bool) {
        self.shuffled = shuffled;
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }
}

/// A queue edit as sent to the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum QueueCommand {
    Append { track: Track },
    Remove { indices: Vec<usize> },
    Reorder { from: usize, to: usize },
    Select { index: usize },
    Clear,
    SetShuffle { enabled: bool },
    SetRepeat { mode: RepeatMode },
}

impl QueueCommand {
    pub fn name(&self) -> &'static str {
        match self {
            QueueCommand::Append { .. } => "append",
            QueueCommand::Remove { .. } => "remove",
            QueueCommand::Reorder { .. } => "reorder",
            QueueCommand::Select { .. } => "select",
            QueueCommand::Clear => "clear",
            QueueCommand::SetShuffle { .. } => "set_shuffle",
            QueueCommand::SetRepeat { .. } => "set_repeat",
        }
    }

    /// Applies the command to local state. Validation happens here so a
    /// rejected command leaves the state untouched.
    pub fn apply_to(&self, state: &mut QueueState) -> Result<(), QueueError> {
        match self {
            QueueCommand::Append { track } => state.append(track.clone()),
            QueueCommand::Remove { indices } => {
                for &index in indices {
                    state.check_index(index)?;
                }
                let mut sorted = indices.clone();
                sorted.sort_unstable();
                sorted.dedup();
                // Highest first so earlier removals do not shift later ones
                for &index in sorted.iter().rev() {
                    state.remove_at(index)?;
                }
            }
            QueueCommand::Reorder { from, to } => state.reorder(*from, *to)?,
            QueueCommand::Select { index } => state.select(*index)?,
            QueueCommand::Clear => state.clear(),
            QueueCommand::SetShuffle { enabled } => state.set_shuffled(*enabled),
            QueueCommand::SetRepeat { mode } => state.set_repeat_mode(*mode),
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationPhase {
    Pending,
    Confirmed,
    RolledBack,
}

/// An optimistically applied command together with the state it replaced
#[derive(Clone, Debug)]
pub struct PendingMutation {
    id: u64,
    command: QueueCommand,
    snapshot: QueueState,
    phase: MutationPhase,
}

impl PendingMutation {
    /// Applies `command` to `state`, keeping a copy of the state beforehand.
    pub fn begin(id: u64, command: QueueCommand, state: &mut QueueState) -> Result<Self, QueueError> {
        let snapshot = state.clone();
        command.apply_to(state)?;
        Ok(Self {
            id,
            command,
            snapshot,
            phase: MutationPhase::Pending,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn command(&self) -> &QueueCommand {
        &self.command
    }

    pub fn phase(&self) -> MutationPhase {
        self.phase
    }

    pub fn confirm(mut self) -> Self {
        self.phase = MutationPhase::Confirmed;
        self
    }

    /// Puts the pre-command state back.
    pub fn rollback(mut self, state: &mut QueueState) -> Self {
        *state = self.snapshot.clone();
        self.phase = MutationPhase::RolledBack;
        self
    }
}

/// What the caller needs to finish a mutation it started
#[derive(Clone, Debug)]
pub struct MutationTicket {
    pub id: u64,
    pub command: QueueCommand,
    pub previous_track: Option<Track>,
    pub current_track: Option<Track>,
}

impl MutationTicket {
    pub fn changes_current_track(&self) -> bool {
        self.previous_track.as_ref().map(|t| t.id) != self.current_track.as_ref().map(|t| t.id)
    }

    /// Whether the session has to follow this edit: the edit moved or picked
    /// the queue's current entry and the session is playing something else.
    pub fn moves_session(&self, session_track: Option<TrackId>) -> bool {
        let picks_current = matches!(self.command, QueueCommand::Select { .. }) || self.changes_current_track();
        picks_current && self.current_track.as_ref().map(|t| t.id) != session_track
    }
}

/// Queue order as reported by the server
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RemoteQueue {
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub current_index: Option<usize>,
    #[serde(default)]
    pub shuffled: Option<bool>,
    #[serde(default)]
    pub repeat_mode: Option<RepeatMode>,
    #[serde(default)]
    pub sequence: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteQueueOutcome {
    Applied,
    Stale,
    Deferred,
}

#[derive(Debug, Default)]
pub struct QueueEngine {
    state: QueueState,
    pending: Option<PendingMutation>,
    next_id: u64,
    last_remote_sequence: Option<u64>,
    deferred_remote: Option<RemoteQueue>,
}

impl QueueEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn begin(&mut self, command: QueueCommand) -> Result<MutationTicket, QueueError> {
        if self.pending.is_some() {
            return Err(QueueError::MutationInFlight);
        }
        let previous_track = self.state.current_track().cloned();
        self.next_id += 1;
        let pending = PendingMutation::begin(self.next_id, command, &mut self.state)?;
        let ticket = MutationTicket {
            id: pending.id(),
            command: pending.command().clone(),
            previous_track,
            current_track: self.state.current_track().cloned(),
        };
        self.pending = Some(pending);
        Ok(ticket)
    }

    fn take_pending(&mut self, id: u64) -> Result<PendingMutation, QueueError> {
        match self.pending.take() {
            Some(pending) if pending.id() == id => Ok(pending),
            other => {
                self.pending = other;
                Err(QueueError::UnknownMutation(id))
            }
        }
    }

    pub fn confirm(&mut self, id: u64) -> Result<MutationPhase, QueueError> {
        let settled = self.take_pending(id)?.confirm();
        self.replay_deferred();
        Ok(settled.phase())
    }

    pub fn rollback(&mut self, id: u64) -> Result<MutationPhase, QueueError> {
        let settled = self.take_pending(id)?.rollback(&mut self.state);
        self.replay_deferred();
        Ok(settled.phase())
    }

    /// Adopts server-confirmed order unless a local edit is still in flight.
    pub fn apply_remote(&mut self, remote: RemoteQueue) -> RemoteQueueOutcome {
        if let (Some(incoming), Some(last)) = (remote.sequence, self.last_remote_sequence) {
            if incoming < last {
                return RemoteQueueOutcome::Stale;
            }
        }
        if self.pending.is_some() {
            let held = self.deferred_remote.as_ref().and_then(|deferred| deferred.sequence);
            if let (Some(incoming), Some(held)) = (remote.sequence, held) {
                if incoming < held {
                    return RemoteQueueOutcome::Stale;
                }
            }
            self.deferred_remote = Some(remote);
            return RemoteQueueOutcome::Deferred;
        }
        let shuffled = remote.shuffled.unwrap_or(self.state.shuffled);
        let repeat_mode = remote.repeat_mode.unwrap_or(self.state.repeat_mode);
        self.state = QueueState::from_parts(remote.tracks, remote.current_index, shuffled, repeat_mode);
        if remote.sequence.is_some() {
            self.last_remote_sequence = remote.sequence;
        }
        RemoteQueueOutcome::Applied
    }

    fn replay_deferred(&mut self) {
        if let Some(remote) = self.deferred_remote.take() {
            self.apply_remote(remote);
        }
    }
}
