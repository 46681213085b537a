//! Reacts to audio binding changes published by the resource binder

use tokio::task::JoinHandle;

use crate::audio::{AudioResourceBinding, BindingStatus};
use super::AppController;

impl AppController {
    pub(crate) async fn handle_binding_change(&self, previous: BindingStatus, binding: &AudioResourceBinding) {
        if binding.status == previous {
            return;
        }
        match binding.status {
            BindingStatus::Playing => {
                let Some(track) = self.model.current_track() else {
                    return;
                };
                if Some(track.id) == binding.track_id {
                    tracing::debug!(track_id = track.id, title = %track.title, "Recording played track");
                    self.model.record_played(&track).await;
                }
            }
            BindingStatus::Error => {
                if let Some(kind) = binding.error {
                    self.model.set_error(kind.to_string()).await;
                }
            }
            _ => {}
        }
    }

    pub fn start_player_event_listener(&self) -> JoinHandle<()> {
        let controller = self.clone();
        let mut binding_rx = self.model.subscribe_binding();
        tracing::info!("Starting audio binding listener");

        tokio::spawn(async move {
            let mut previous = binding_rx.borrow_and_update().status;
            while binding_rx.changed().await.is_ok() {
                if controller.model.should_quit().await {
                    tracing::debug!("Audio binding listener shutting down");
                    break;
                }
                let binding = binding_rx.borrow_and_update().clone();
                controller.handle_binding_change(previous, &binding).await;
                previous = binding.status;
            }
        })
    }
}
