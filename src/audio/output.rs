//! HTTP-backed audio output handle
//!
//! `load()` opens the stream and reports whether it is playable. Decoding and
//! rendering belong to the audio sink behind this handle and are not modelled
//! here; play/pause are reported straight back as events. A load still in
//! flight when the source changes is cancelled and reported as aborted.

use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::StatusCode;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::{AudioOutput, Generation, MediaErrorKind, OutputConfig, OutputEvent, PlayRejection, PlaybackControl};

pub struct StreamOutput {
    http: reqwest::Client,
    base_url: String,
    events: UnboundedSender<OutputEvent>,
    config: Option<OutputConfig>,
    source: Option<String>,
    generation: Generation,
    playing: bool,
    in_flight: Option<(Generation, JoinHandle<()>)>,
}

impl StreamOutput {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, events: UnboundedSender<OutputEvent>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            events,
            config: None,
            source: None,
            generation: 0,
            playing: false,
            in_flight: None,
        }
    }

    fn emit(&self, event: OutputEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!(?event, "Output event dropped, binder is gone");
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some((generation, task)) = self.in_flight.take() {
            if !task.is_finished() {
                task.abort();
                tracing::debug!(generation, "Stream load aborted");
                self.emit(OutputEvent::Error { generation, kind: MediaErrorKind::Aborted });
            }
        }
    }
}

fn classify_response(status: StatusCode, content_type: Option<&str>) -> Result<(), MediaErrorKind> {
    if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
        return Err(MediaErrorKind::UnsupportedFormat);
    }
    if !status.is_success() {
        return Err(MediaErrorKind::Network);
    }
    match content_type {
        Some(ct) if ct.starts_with("audio/") || ct.starts_with("application/octet-stream") => Ok(()),
        None => Ok(()),
        Some(_) => Err(MediaErrorKind::UnsupportedFormat),
    }
}

fn classify_transport_error(error: &reqwest::Error) -> MediaErrorKind {
    if error.is_decode() || error.is_body() {
        MediaErrorKind::Decode
    } else if error.is_timeout() || error.is_connect() || error.is_request() {
        MediaErrorKind::Network
    } else {
        MediaErrorKind::Unknown
    }
}

impl PlaybackControl for StreamOutput {
    fn configure(&mut self, config: OutputConfig) {
        tracing::debug!(?config, "Audio output configured");
        self.config = Some(config);
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn play(&mut self) -> Result<(), PlayRejection> {
        if self.source.is_none() {
            return Err(PlayRejection::NoSource);
        }
        if self.config.is_none() {
            return Err(PlayRejection::Output("output not configured".to_string()));
        }
        self.playing = true;
        self.emit(OutputEvent::PlayStarted { generation: self.generation });
        Ok(())
    }

    fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.emit(OutputEvent::Paused { generation: self.generation });
        }
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

impl AudioOutput for StreamOutput {
    fn set_source(&mut self, locator: &str, generation: Generation) {
        self.abort_in_flight();
        self.source = Some(locator.to_string());
        self.generation = generation;
        self.playing = false;
    }

    fn clear_source(&mut self) {
        self.abort_in_flight();
        self.source = None;
        self.playing = false;
    }

    fn load(&mut self) {
        let Some(locator) = self.source.clone() else {
            tracing::warn!("load() called without a source");
            return;
        };
        // A reload of the same source replaces the earlier request quietly
        if let Some((_, task)) = self.in_flight.take() {
            task.abort();
        }
        let url = format!("{}{}", self.base_url, locator);
        let generation = self.generation;
        let eager = self.config.as_ref().is_none_or(|config| config.eager_preload);
        let http = self.http.clone();
        let events = self.events.clone();

        let task = tokio::spawn(async move {
            let event = match http.get(&url).header(RANGE, "bytes=0-1").send().await {
                Ok(mut response) => {
                    let content_type = response
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    match classify_response(response.status(), content_type.as_deref()) {
                        Ok(()) if !eager => OutputEvent::CanPlay { generation },
                        Ok(()) => match response.chunk().await {
                            Ok(Some(_)) => OutputEvent::CanPlay { generation },
                            Ok(None) => OutputEvent::Error { generation, kind: MediaErrorKind::Decode },
                            Err(e) => OutputEvent::Error { generation, kind: classify_transport_error(&e) },
                        },
                        Err(kind) => OutputEvent::Error { generation, kind },
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, url = %url, "Stream request failed");
                    OutputEvent::Error { generation, kind: classify_transport_error(&e) }
                }
            };
            let _ = events.send(event);
        });
        self.in_flight = Some((generation, task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn response_classification() {
        assert_eq!(classify_response(StatusCode::PARTIAL_CONTENT, Some("audio/flac")), Ok(()));
        assert_eq!(classify_response(StatusCode::OK, None), Ok(()));
        assert_eq!(
            classify_response(StatusCode::OK, Some("text/html")),
            Err(MediaErrorKind::UnsupportedFormat)
        );
        assert_eq!(
            classify_response(StatusCode::UNSUPPORTED_MEDIA_TYPE, Some("audio/flac")),
            Err(MediaErrorKind::UnsupportedFormat)
        );
        assert_eq!(classify_response(StatusCode::NOT_FOUND, None), Err(MediaErrorKind::Network));
    }

    #[test]
    fn play_requires_source_and_reports_start() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = StreamOutput::new(reqwest::Client::new(), "http://127.0.0.1:9", tx);
        output.configure(OutputConfig::for_remote_stream());
        assert_eq!(output.play(), Err(PlayRejection::NoSource));

        output.set_source("/stream/1", 3);
        assert_eq!(output.play(), Ok(()));
        assert_eq!(rx.try_recv().unwrap(), OutputEvent::PlayStarted { generation: 3 });

        output.pause();
        assert_eq!(rx.try_recv().unwrap(), OutputEvent::Paused { generation: 3 });
        assert!(!output.is_playing());
    }

    #[tokio::test]
    async fn replacing_the_source_aborts_the_pending_load() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = StreamOutput::new(reqwest::Client::new(), "http://127.0.0.1:9", tx);
        output.configure(OutputConfig::for_remote_stream());

        output.set_source("/stream/1", 1);
        output.load();
        output.set_source("/stream/2", 2);

        assert_eq!(
            rx.try_recv().unwrap(),
            OutputEvent::Error { generation: 1, kind: MediaErrorKind::Aborted }
        );
        assert_eq!(output.source(), Some("/stream/2"));
    }

    #[tokio::test]
    async fn clearing_without_a_pending_load_reports_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = StreamOutput::new(reqwest::Client::new(), "http://127.0.0.1:9", tx);
        output.set_source("/stream/1", 1);
        output.clear_source();
        assert!(rx.try_recv().is_err());
    }
}
