//! Startup status pull

use crate::model::{StateUpdate, UpdateOutcome};
use super::AppController;

impl AppController {
    /// Pulls `GET /status` once and offers the result to the session.
    ///
    /// A failed pull leaves the session as it is and is not retried.
    pub async fn bootstrap_status(&self) -> Option<UpdateOutcome> {
        tracing::info!("Bootstrapping playback state");
        match self.backends.status.fetch_status().await {
            Ok(state) => {
                let track_id = state.current_track.as_ref().map(|t| t.id);
                let outcome = self.model.apply_update(StateUpdate::Bootstrap {
                    track: state.current_track,
                    sequence: state.sequence,
                });
                tracing::info!(?track_id, sequence = ?state.sequence, ?outcome, "Bootstrap finished");
                Some(outcome)
            }
            Err(e) => {
                tracing::error!(error = %e, "Bootstrap status pull failed");
                self.model.set_error(Self::format_error(&e)).await;
                None
            }
        }
    }
}
