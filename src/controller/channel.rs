//! Push channel listener
//!
//! Each text frame is a `{type, data}` envelope. `player_state` deltas go
//! through the session reducer, `queue_state` snapshots through the queue
//! engine. A frame that cannot be parsed is logged and dropped; only a
//! transport failure or a server close ends the subscription.

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::model::{PlayerState, RemoteQueue, StateUpdate};
use super::AppController;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("connection closed by server: {0}")]
    Closed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelMessage {
    PlayerState(PlayerState),
    QueueState(RemoteQueue),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parses one text frame. Unknown topics yield `Ok(None)`.
pub fn parse_message(text: &str) -> Result<Option<ChannelMessage>, ChannelError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let message = match envelope.kind.as_str() {
        "player_state" => ChannelMessage::PlayerState(serde_json::from_value(envelope.data)?),
        "queue_state" => ChannelMessage::QueueState(serde_json::from_value(envelope.data)?),
        other => {
            tracing::trace!(topic = other, "Ignoring push message with unknown topic");
            return Ok(None);
        }
    };
    Ok(Some(message))
}

impl AppController {
    pub async fn handle_channel_message(&self, message: ChannelMessage) {
        match message {
            ChannelMessage::PlayerState(state) => {
                self.model.apply_update(StateUpdate::Push {
                    track: state.current_track,
                    sequence: state.sequence,
                });
            }
            ChannelMessage::QueueState(remote) => {
                self.model.apply_remote_queue(remote).await;
                self.model.clamp_selections().await;
            }
        }
    }

    pub async fn handle_channel_text(&self, text: &str) {
        match parse_message(text) {
            Ok(Some(message)) => self.handle_channel_message(message).await,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Dropping malformed push message"),
        }
    }

    /// Subscribes to the push channel for the rest of the session.
    pub fn start_channel_listener(&self, url: String) -> JoinHandle<()> {
        let controller = self.clone();
        tracing::info!(url = %url, "Starting push channel listener");

        tokio::spawn(async move {
            if let Err(e) = controller.listen(&url).await {
                tracing::warn!(error = %e, "Push channel ended");
                controller
                    .model
                    .set_error(format!("Live updates stopped: {}", e))
                    .await;
            }
        })
    }

    async fn listen(&self, url: &str) -> Result<(), ChannelError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        tracing::info!("Push channel connected");

        while let Some(frame) = ws_rx.next().await {
            if self.model.should_quit().await {
                tracing::debug!("Push channel listener shutting down");
                return Ok(());
            }

            match frame? {
                Message::Text(text) => self.handle_channel_text(&text).await,
                Message::Ping(payload) => {
                    tracing::trace!("ping -> pong");
                    ws_tx.send(Message::Pong(payload)).await?;
                }
                Message::Close(payload) => {
                    return Err(ChannelError::Closed(format!("{:?}", payload)));
                }
                _ => tracing::trace!("Ignoring non-text push frame"),
            }
        }
        Err(ChannelError::Closed("stream ended".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{harness, track, FakeBackend};
    use crate::model::{QueueCommand, RepeatMode};

    #[test]
    fn parses_player_state_envelope() {
        let text = r#"{"type":"player_state","data":{"current_track":{"id":42,"title":"Song","artist":"Band","duration":210},"sequence":5}}"#;
        let Some(ChannelMessage::PlayerState(state)) = parse_message(text).unwrap() else {
            panic!("expected a player_state message");
        };
        assert_eq!(state.sequence, Some(5));
        assert_eq!(state.current_track.map(|t| t.duration_secs), Some(210));
    }

    #[test]
    fn parses_queue_state_and_ignores_unknown_topics() {
        let text = r#"{"type":"queue_state","data":{"tracks":[],"current_index":null,"repeat_mode":"all","sequence":2}}"#;
        let Some(ChannelMessage::QueueState(queue)) = parse_message(text).unwrap() else {
            panic!("expected a queue_state message");
        };
        assert_eq!(queue.repeat_mode, Some(RepeatMode::All));
        assert_eq!(queue.sequence, Some(2));

        assert!(parse_message(r#"{"type":"volume","data":{"level":3}}"#).unwrap().is_none());
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(parse_message("not json"), Err(ChannelError::Malformed(_))));
        assert!(matches!(
            parse_message(r#"{"type":"player_state","data":{"sequence":"five"}}"#),
            Err(ChannelError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn out_of_order_pushes_never_roll_back() {
        let h = harness(FakeBackend::default());
        let push = |id: u64, seq: u64| {
            format!(
                r#"{{"type":"player_state","data":{{"current_track":{{"id":{id},"title":"T","artist":"A"}},"sequence":{seq}}}}}"#
            )
        };

        h.controller.handle_channel_text(&push(2, 7)).await;
        h.controller.handle_channel_text(&push(1, 4)).await;
        h.controller.handle_channel_text("{garbage").await;
        assert_eq!(h.controller.model.current_track().map(|t| t.id), Some(2));
        assert_eq!(h.controller.model.session().last_sequence(), Some(7));

        h.controller.handle_channel_text(&push(3, 7)).await;
        assert_eq!(h.controller.model.current_track().map(|t| t.id), Some(3));
    }

    #[tokio::test]
    async fn push_without_track_clears_session() {
        let h = harness(FakeBackend::default());
        h.controller
            .handle_channel_message(ChannelMessage::PlayerState(PlayerState {
                current_track: Some(track(1)),
                sequence: Some(1),
            }))
            .await;
        h.controller
            .handle_channel_text(r#"{"type":"player_state","data":{"sequence":2}}"#)
            .await;
        assert_eq!(h.controller.model.current_track(), None);
    }

    #[tokio::test]
    async fn queue_snapshot_replaces_local_queue() {
        let h = harness(FakeBackend::default());
        h.controller.append_track(track(1)).await;
        assert_eq!(h.backend.sent(), vec![QueueCommand::Append { track: track(1) }]);

        h.controller
            .handle_channel_message(ChannelMessage::QueueState(RemoteQueue {
                tracks: vec![track(4), track(5)],
                current_index: Some(1),
                shuffled: Some(true),
                repeat_mode: None,
                sequence: Some(1),
            }))
            .await;

        let queue = h.controller.model.get_queue_state().await;
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.current_index(), Some(1));
        assert!(queue.shuffled());
    }
}
