//! Main application model with state management

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};

use super::content::{ContentState, HistoryEntry, HISTORY_LIMIT};
use super::library::{LibraryBrowser, LibraryPage};
use super::playback::{Enhancement, HoldRelease, PlaybackInfo, PlaybackSession, StateUpdate, UpdateOutcome};
use super::queue::{MutationPhase, MutationTicket, QueueCommand, QueueEntry, QueueEngine, QueueError, QueueState, RemoteQueue, RemoteQueueOutcome};
use super::recommend::{rank_suggestions, Suggestion};
use super::types::{ActivePane, Track, TrackId, UiState};
use crate::audio::AudioResourceBinding;

/// Main application model containing all state
pub struct AppModel {
    session_tx: watch::Sender<PlaybackSession>,
    binding_rx: watch::Receiver<AudioResourceBinding>,
    queue: Arc<Mutex<QueueEngine>>,
    library: Arc<Mutex<LibraryBrowser>>,
    history: Arc<Mutex<VecDeque<HistoryEntry>>>,
    pub ui_state: Arc<Mutex<UiState>>,
    pub should_quit: Arc<Mutex<bool>>,
}

impl AppModel {
    pub fn new(enhancement: Enhancement, binding_rx: watch::Receiver<AudioResourceBinding>) -> Self {
        let (session_tx, _) = watch::channel(PlaybackSession::new(enhancement));
        Self {
            session_tx,
            binding_rx,
            queue: Arc::new(Mutex::new(QueueEngine::new())),
            library: Arc::new(Mutex::new(LibraryBrowser::default())),
            history: Arc::new(Mutex::new(VecDeque::with_capacity(HISTORY_LIMIT))),
            ui_state: Arc::new(Mutex::new(UiState::default())),
            should_quit: Arc::new(Mutex::new(false)),
        }
    }

    // ========================================================================
    // Playback session
    // ========================================================================

    /// Runs `update` through the session reducer. Subscribers are notified
    /// only when the session actually changed.
    pub fn apply_update(&self, update: StateUpdate) -> UpdateOutcome {
        let source = update.source();
        if let StateUpdate::Local { cause, ref track } = update {
            tracing::debug!(?cause, track_id = ?track.as_ref().map(|t| t.id), "Local track change");
        }

        let mut outcome = UpdateOutcome::Applied;
        self.session_tx.send_if_modified(|session| {
            let before = session.clone();
            outcome = session.apply(update);
            *session != before
        });

        let session = self.session_tx.borrow();
        match outcome {
            UpdateOutcome::Applied => tracing::debug!(
                source,
                track_id = ?session.current_track_id(),
                sequence = ?session.last_sequence(),
                "State update applied"
            ),
            UpdateOutcome::Discarded(reason) => tracing::debug!(source, ?reason, "State update discarded"),
            UpdateOutcome::Deferred => {
                tracing::debug!(source, "State update deferred until the local change settles")
            }
        }
        outcome
    }

    pub fn release_hold(&self, release: HoldRelease) {
        let mut replayed = None;
        self.session_tx.send_if_modified(|session| {
            let before = session.clone();
            replayed = session.release_hold(release);
            *session != before
        });
        if let Some(outcome) = replayed {
            tracing::debug!(?release, ?outcome, "Deferred remote update replayed");
        }
    }

    pub fn subscribe_session(&self) -> watch::Receiver<PlaybackSession> {
        self.session_tx.subscribe()
    }

    pub fn session(&self) -> PlaybackSession {
        self.session_tx.borrow().clone()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.session_tx.borrow().current_track().cloned()
    }

    pub fn enhancement(&self) -> Enhancement {
        self.session_tx.borrow().enhancement().clone()
    }

    pub fn set_enhancement(&self, enhancement: Enhancement) {
        self.apply_update(StateUpdate::Enhancement(enhancement));
    }

    pub fn binding(&self) -> AudioResourceBinding {
        self.binding_rx.borrow().clone()
    }

    pub fn subscribe_binding(&self) -> watch::Receiver<AudioResourceBinding> {
        self.binding_rx.clone()
    }

    pub async fn get_playback_info(&self) -> PlaybackInfo {
        let queue = self.queue.lock().await;
        let session = self.session_tx.borrow();
        PlaybackInfo {
            track: session.current_track().cloned(),
            sequence: session.last_sequence(),
            awaiting_confirmation: session.is_held(),
            enhancement: session.enhancement().clone(),
            binding: self.binding_rx.borrow().clone(),
            shuffled: queue.state().shuffled(),
            repeat_mode: queue.state().repeat_mode(),
        }
    }

    // ========================================================================
    // Queue
    // ========================================================================

    pub async fn get_queue_state(&self) -> QueueState {
        self.queue.lock().await.state().clone()
    }

    pub async fn begin_queue_mutation(&self, command: QueueCommand) -> Result<MutationTicket, QueueError> {
        self.queue.lock().await.begin(command)
    }

    pub async fn confirm_queue_mutation(&self, id: u64) -> Result<MutationPhase, QueueError> {
        self.queue.lock().await.confirm(id)
    }

    pub async fn rollback_queue_mutation(&self, id: u64) -> Result<MutationPhase, QueueError> {
        self.queue.lock().await.rollback(id)
    }

    pub async fn apply_remote_queue(&self, remote: RemoteQueue) -> RemoteQueueOutcome {
        let sequence = remote.sequence;
        let outcome = self.queue.lock().await.apply_remote(remote);
        tracing::debug!(?sequence, ?outcome, "Remote queue state received");
        outcome
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// Marks a page request as in flight and returns its offset, or `None`
    /// when a request is already running or the library is exhausted.
    pub async fn start_library_page(&self) -> Option<usize> {
        let mut library = self.library.lock().await;
        if !library.can_load_more() {
            return None;
        }
        library.loading_more = true;
        Some(library.next_offset)
    }

    pub async fn append_library_page(&self, page: LibraryPage) -> usize {
        self.library.lock().await.append_page(page)
    }

    pub async fn library_page_failed(&self) {
        self.library.lock().await.loading_more = false;
    }

    // ========================================================================
    // History & suggestions
    // ========================================================================

    /// Records `track` as played. Consecutive repeats of the same track are collapsed.
    pub async fn record_played(&self, track: &Track) {
        let mut history = self.history.lock().await;
        if history.front().is_some_and(|entry| entry.track_id == track.id) {
            return;
        }
        history.push_front(HistoryEntry::now(track));
        history.truncate(HISTORY_LIMIT);
    }

    pub async fn history_ids(&self) -> Vec<TrackId> {
        self.history.lock().await.iter().map(|entry| entry.track_id).collect()
    }

    pub async fn suggestions(&self) -> Vec<Suggestion> {
        let history = self.history_ids().await;
        let queue = self.queue.lock().await;
        let library = self.library.lock().await;
        let session = self.session_tx.borrow();
        rank_suggestions(queue.state(), session.current_track(), &history, &library.tracks)
    }

    pub async fn get_content_state(&self) -> ContentState {
        let suggestions = self.suggestions().await;
        let history = self.history.lock().await.iter().cloned().collect();
        let queue = self.queue.lock().await;
        let library = self.library.lock().await;
        ContentState {
            queue: queue.state().clone(),
            queue_pending: queue.has_pending(),
            library: library.tracks.clone(),
            library_has_more: library.has_more,
            library_loading: library.loading_more,
            suggestions,
            history,
        }
    }

    // ========================================================================
    // UI state
    // ========================================================================

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }

    pub async fn get_ui_state(&self) -> UiState {
        self.ui_state.lock().await.clone()
    }

    pub async fn cycle_pane_forward(&self) {
        let mut state = self.ui_state.lock().await;
        state.active_pane = state.active_pane.next();
    }

    pub async fn cycle_pane_backward(&self) {
        let mut state = self.ui_state.lock().await;
        state.active_pane = state.active_pane.prev();
    }

    async fn active_pane_len(&self, pane: ActivePane) -> usize {
        match pane {
            ActivePane::Queue => self.queue.lock().await.state().len(),
            ActivePane::Library => self.library.lock().await.tracks.len(),
            ActivePane::Suggestions => self.suggestions().await.len(),
        }
    }

    pub async fn move_selection_up(&self) {
        let mut state = self.ui_state.lock().await;
        let selected = state.selected_mut();
        *selected = selected.saturating_sub(1);
    }

    pub async fn move_selection_down(&self) {
        let pane = self.ui_state.lock().await.active_pane;
        let len = self.active_pane_len(pane).await;
        let mut state = self.ui_state.lock().await;
        let selected = state.selected_mut();
        if *selected < len.saturating_sub(1) {
            *selected += 1;
        }
    }

    pub async fn set_queue_selection(&self, index: usize) {
        self.ui_state.lock().await.queue_selected = index;
    }

    /// Keeps every pane's selection inside its list after the lists changed.
    pub async fn clamp_selections(&self) {
        let queue_len = self.active_pane_len(ActivePane::Queue).await;
        let library_len = self.active_pane_len(ActivePane::Library).await;
        let suggestion_len = self.active_pane_len(ActivePane::Suggestions).await;
        let mut state = self.ui_state.lock().await;
        state.queue_selected = state.queue_selected.min(queue_len.saturating_sub(1));
        state.library_selected = state.library_selected.min(library_len.saturating_sub(1));
        state.suggestion_selected = state.suggestion_selected.min(suggestion_len.saturating_sub(1));
    }

    pub async fn selected_queue_entry(&self) -> Option<QueueEntry> {
        let selected = self.ui_state.lock().await.queue_selected;
        self.queue.lock().await.state().entry_at(selected)
    }

    pub async fn selected_library_track(&self) -> Option<Track> {
        let selected = self.ui_state.lock().await.library_selected;
        self.library.lock().await.tracks.get(selected).cloned()
    }

    pub async fn selected_suggestion(&self) -> Option<Track> {
        let selected = self.ui_state.lock().await.suggestion_selected;
        self.suggestions().await.into_iter().nth(selected).map(|s| s.track)
    }

    pub async fn set_error(&self, message: String) {
        let mut state = self.ui_state.lock().await;
        state.error_message = Some(message);
        state.error_timestamp = Some(Instant::now());
    }

    pub async fn clear_error(&self) {
        let mut state = self.ui_state.lock().await;
        state.error_message = None;
        state.error_timestamp = None;
    }

    pub async fn has_error(&self) -> bool {
        self.ui_state.lock().await.error_message.is_some()
    }

    pub async fn auto_clear_old_errors(&self) {
        let mut state = self.ui_state.lock().await;
        if let Some(timestamp) = state.error_timestamp {
            if timestamp.elapsed().as_secs() > 5 {
                state.error_message = None;
                state.error_timestamp = None;
            }
        }
    }

    pub async fn show_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = true;
    }

    pub async fn hide_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = false;
    }

    pub async fn is_help_popup_open(&self) -> bool {
        self.ui_state.lock().await.show_help_popup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiscardReason, LocalCause};

    fn track(id: TrackId, artist: &str) -> Track {
        Track {
            id,
            title: format!("Track {id}"),
            artist: artist.to_string(),
            album: None,
            duration_secs: 180,
            artwork_url: None,
        }
    }

    fn model() -> AppModel {
        let (_tx, rx) = watch::channel(AudioResourceBinding::default());
        AppModel::new(Enhancement::default(), rx)
    }

    #[test]
    fn only_real_changes_notify_subscribers() {
        let model = model();
        let mut rx = model.subscribe_session();

        let outcome = model.apply_update(StateUpdate::Push { track: Some(track(1, "A")), sequence: Some(5) });
        assert!(outcome.is_applied());
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        let outcome = model.apply_update(StateUpdate::Bootstrap { track: Some(track(2, "A")), sequence: Some(3) });
        assert_eq!(
            outcome,
            UpdateOutcome::Discarded(DiscardReason::Stale { sequence: 3, last_applied: 5 })
        );
        assert!(!rx.has_changed().unwrap());
        assert_eq!(model.current_track().map(|t| t.id), Some(1));
    }

    #[test]
    fn rollback_release_restores_previous_track() {
        let model = model();
        model.apply_update(StateUpdate::Push { track: Some(track(1, "A")), sequence: Some(1) });
        model.apply_update(StateUpdate::Local { track: None, cause: LocalCause::Cleared });
        assert_eq!(model.current_track(), None);

        model.release_hold(HoldRelease::RolledBack);
        assert_eq!(model.current_track().map(|t| t.id), Some(1));
        assert!(!model.session().is_held());
    }

    #[tokio::test]
    async fn history_is_bounded_and_collapses_repeats() {
        let model = model();
        model.record_played(&track(1, "A")).await;
        model.record_played(&track(1, "A")).await;
        assert_eq!(model.history_ids().await, vec![1]);

        for id in 2..=(HISTORY_LIMIT as u64 + 10) {
            model.record_played(&track(id, "A")).await;
        }
        let ids = model.history_ids().await;
        assert_eq!(ids.len(), HISTORY_LIMIT);
        assert_eq!(ids[0], HISTORY_LIMIT as u64 + 10);
    }

    #[tokio::test]
    async fn suggestions_skip_queued_and_played_tracks() {
        let model = model();
        model
            .append_library_page(LibraryPage {
                tracks: vec![track(1, "A"), track(2, "B"), track(3, "C")],
                has_more: false,
            })
            .await;
        let ticket = model.begin_queue_mutation(QueueCommand::Append { track: track(1, "A") }).await.unwrap();
        model.confirm_queue_mutation(ticket.id).await.unwrap();
        model.record_played(&track(2, "B")).await;

        let ids: Vec<TrackId> = model.suggestions().await.iter().map(|s| s.track.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn library_page_requests_do_not_overlap() {
        let model = model();
        assert_eq!(model.start_library_page().await, Some(0));
        assert_eq!(model.start_library_page().await, None);

        model.append_library_page(LibraryPage { tracks: vec![track(1, "A")], has_more: true }).await;
        assert_eq!(model.start_library_page().await, Some(1));
        model.library_page_failed().await;
        assert_eq!(model.start_library_page().await, Some(1));
    }

    #[tokio::test]
    async fn selection_stays_inside_the_active_pane() {
        let model = model();
        model.move_selection_down().await;
        assert_eq!(model.get_ui_state().await.queue_selected, 0);

        for id in 1..=3 {
            let ticket = model.begin_queue_mutation(QueueCommand::Append { track: track(id, "A") }).await.unwrap();
            model.confirm_queue_mutation(ticket.id).await.unwrap();
        }
        for _ in 0..5 {
            model.move_selection_down().await;
        }
        assert_eq!(model.selected_queue_entry().await, Some(QueueEntry { track_id: 3, index: 2 }));

        let ticket = model.begin_queue_mutation(QueueCommand::Clear).await.unwrap();
        model.confirm_queue_mutation(ticket.id).await.unwrap();
        model.clamp_selections().await;
        assert_eq!(model.selected_queue_entry().await, None);
    }
}
