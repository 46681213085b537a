//! Optimistic queue mutations
//!
//! Each mutation runs under the mutation gate: apply locally, send the
//! command, then confirm or roll back. A second mutation waits at the gate
//! until the first one has settled, and only then works out its indices from
//! the queue as the first one left it.

use anyhow::Result;

use crate::model::{
    HoldRelease, LocalCause, MutationPhase, QueueCommand, QueueEntry, QueueState, StateUpdate, Track,
};
use super::AppController;

/// An edit aimed at a queue entry the user picked
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryEdit {
    Remove,
    MoveUp,
    MoveDown,
    Play,
}

impl EntryEdit {
    /// The command for the entry now at `index`, or `None` when a move would
    /// leave the queue.
    fn command(self, index: usize, queue: &QueueState) -> Option<QueueCommand> {
        match self {
            EntryEdit::Remove => Some(QueueCommand::Remove { indices: vec![index] }),
            EntryEdit::Play => Some(QueueCommand::Select { index }),
            EntryEdit::MoveUp => index.checked_sub(1).map(|to| QueueCommand::Reorder { from: index, to }),
            EntryEdit::MoveDown => {
                (index + 1 < queue.len()).then(|| QueueCommand::Reorder { from: index, to: index + 1 })
            }
        }
    }
}

impl AppController {
    pub(crate) async fn run_mutation(&self, command: QueueCommand) -> Result<MutationPhase> {
        let _gate = self.mutation_gate.lock().await;
        self.run_gated(command).await
    }

    /// Begin, send, settle. The caller holds the mutation gate.
    async fn run_gated(&self, command: QueueCommand) -> Result<MutationPhase> {
        let ticket = self.model.begin_queue_mutation(command).await?;
        let moves_session = ticket.moves_session(self.model.current_track().map(|t| t.id));
        if moves_session {
            let cause = match ticket.command {
                QueueCommand::Remove { .. } => LocalCause::RemovedCurrent,
                QueueCommand::Clear => LocalCause::Cleared,
                _ => LocalCause::Selected,
            };
            self.model.apply_update(StateUpdate::Local {
                track: ticket.current_track.clone(),
                cause,
            });
        }
        self.model.clamp_selections().await;

        tracing::debug!(id = ticket.id, command = ticket.command.name(), "Queue change applied locally");

        match self.backends.queue.send_command(&ticket.command).await {
            Ok(()) => {
                let phase = self.model.confirm_queue_mutation(ticket.id).await?;
                if moves_session {
                    self.model.release_hold(HoldRelease::Confirmed);
                }
                tracing::info!(id = ticket.id, command = ticket.command.name(), "Queue change confirmed");
                Ok(phase)
            }
            Err(e) => {
                tracing::warn!(
                    id = ticket.id,
                    command = ticket.command.name(),
                    error = %e,
                    "Queue change rejected, rolling back"
                );
                self.model.rollback_queue_mutation(ticket.id).await?;
                if moves_session {
                    self.model.release_hold(HoldRelease::RolledBack);
                }
                self.model.clamp_selections().await;
                Err(e)
            }
        }
    }

    async fn report(&self, result: Result<MutationPhase>) -> bool {
        match result {
            Ok(_) => true,
            Err(e) => {
                self.model.set_error(Self::format_error(&e)).await;
                false
            }
        }
    }

    pub async fn append_track(&self, track: Track) -> bool {
        tracing::debug!(track_id = track.id, title = %track.title, "Appending to queue");
        let result = self.run_mutation(QueueCommand::Append { track }).await;
        self.report(result).await
    }

    /// Applies `edit` to the entry the user picked. The entry is located again
    /// once the gate is held, so edits queued behind an unconfirmed one act on
    /// the track the user saw rather than on a stale index.
    pub async fn edit_entry(&self, entry: QueueEntry, edit: EntryEdit) -> bool {
        let _gate = self.mutation_gate.lock().await;
        let queue = self.model.get_queue_state().await;

        let Some(index) = queue.position_near(entry.track_id, entry.index) else {
            tracing::debug!(track_id = entry.track_id, ?edit, "Entry left the queue before its edit ran");
            return false;
        };
        if index != entry.index {
            tracing::debug!(track_id = entry.track_id, seen = entry.index, index, "Entry moved since it was picked");
        }
        let Some(command) = edit.command(index, &queue) else {
            return true;
        };

        // The selection follows a moved track right away and goes back if the move is rejected
        let moved_to = match command {
            QueueCommand::Reorder { to, .. } => Some(to),
            _ => None,
        };
        if let Some(to) = moved_to {
            self.model.set_queue_selection(to).await;
        }
        let result = self.run_gated(command).await;
        if result.is_err() && moved_to.is_some() {
            self.model.set_queue_selection(index).await;
        }
        self.report(result).await
    }

    pub async fn clear_queue(&self) -> bool {
        let result = self.run_mutation(QueueCommand::Clear).await;
        self.report(result).await
    }

    pub async fn toggle_shuffle(&self) -> bool {
        let _gate = self.mutation_gate.lock().await;
        let enabled = !self.model.get_queue_state().await.shuffled();
        let result = self.run_gated(QueueCommand::SetShuffle { enabled }).await;
        self.report(result).await
    }

    pub async fn cycle_repeat(&self) -> bool {
        let _gate = self.mutation_gate.lock().await;
        let mode = self.model.get_queue_state().await.repeat_mode().next();
        let result = self.run_gated(QueueCommand::SetRepeat { mode }).await;
        self.report(result).await
    }
}
