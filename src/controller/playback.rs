//! Playback control methods

use crate::audio::{BindingStatus, PlayOutcome};
use crate::model::Enhancement;

use super::AppController;

pub const INTENSITY_STEP: f64 = 0.1;

impl AppController {
    pub async fn toggle_playback(&self) {
        if !self.trigger.is_available() {
            tracing::debug!("Playback toggle ignored, audio bridge is gone");
            return;
        }
        let status = self.model.binding().status;
        tracing::debug!(status = status.label(), "Toggling playback");

        if status == BindingStatus::Playing {
            if let Err(e) = self.trigger.pause() {
                tracing::warn!(error = %e, "Pause failed");
            }
            return;
        }

        match self.trigger.trigger_play() {
            Ok(PlayOutcome::Started) => tracing::info!("Playback started"),
            Ok(PlayOutcome::AlreadyPlaying) => tracing::debug!("Already playing"),
            Err(e) => self.model.set_error(format!("Cannot start playback: {}", e)).await,
        }
    }

    fn update_enhancement(&self, change: impl FnOnce(&Enhancement) -> Enhancement) {
        let current = self.model.enhancement();
        let next = change(&current);
        if next == current {
            return;
        }
        tracing::info!(
            enabled = next.enabled,
            preset = %next.preset,
            intensity = next.intensity,
            "Enhancement changed"
        );
        self.model.set_enhancement(next);
    }

    pub fn toggle_enhancement(&self) {
        self.update_enhancement(|e| Enhancement {
            enabled: !e.enabled,
            ..e.clone()
        });
    }

    pub fn cycle_preset(&self) {
        let presets = self.presets.clone();
        self.update_enhancement(|e| {
            let next = presets
                .iter()
                .position(|p| *p == e.preset)
                .map_or(0, |i| (i + 1) % presets.len());
            match presets.get(next) {
                Some(preset) => Enhancement {
                    preset: preset.clone(),
                    ..e.clone()
                },
                None => e.clone(),
            }
        });
    }

    pub fn increase_intensity(&self) {
        self.update_enhancement(|e| e.nudged(INTENSITY_STEP));
    }

    pub fn decrease_intensity(&self) {
        self.update_enhancement(|e| e.nudged(-INTENSITY_STEP));
    }
}

#[cfg(test)]
mod tests {
    use crate::audio::{AudioResourceBinding, BindingStatus, Interaction, PlayRejection};
    use crate::controller::testing::{harness, FakeBackend};

    #[tokio::test]
    async fn play_before_any_gesture_is_refused() {
        let h = harness(FakeBackend::default());
        h.output.lock().unwrap().source = Some("/stream/1".to_string());

        h.controller.toggle_playback().await;
        let message = h.controller.model.get_ui_state().await.error_message;
        assert_eq!(message, Some(format!("Cannot start playback: {}", PlayRejection::NotAllowed)));
        assert!(!h.output.lock().unwrap().playing);
    }

    #[tokio::test]
    async fn play_after_gesture_then_pause() {
        let h = harness(FakeBackend::default());
        h.output.lock().unwrap().source = Some("/stream/1".to_string());
        h.bridge.trigger().note_interaction(Interaction::KeyPress);

        h.controller.toggle_playback().await;
        assert!(h.output.lock().unwrap().playing);

        h.binding_tx.send_replace(AudioResourceBinding {
            locator: Some("/stream/1".to_string()),
            status: BindingStatus::Playing,
            track_id: Some(1),
            error: None,
        });
        h.controller.toggle_playback().await;
        assert!(!h.output.lock().unwrap().playing);
    }

    #[test]
    fn enhancement_controls_update_the_session() {
        let h = harness(FakeBackend::default());
        h.controller.toggle_enhancement();
        assert!(h.controller.model.enhancement().enabled);

        // balanced -> warm -> bright -> loud -> balanced
        let mut seen = Vec::new();
        for _ in 0..4 {
            h.controller.cycle_preset();
            seen.push(h.controller.model.enhancement().preset);
        }
        assert_eq!(seen, ["warm", "bright", "loud", "balanced"]);

        for _ in 0..8 {
            h.controller.increase_intensity();
        }
        assert_eq!(h.controller.model.enhancement().intensity, 1.0);
        h.controller.decrease_intensity();
        assert_eq!(h.controller.model.enhancement().intensity, 0.9);
    }
}
