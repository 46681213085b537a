//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared utility functions (formatting, scrollable lists)
//! - `layout`: Top bar (enhancement tier, stream status)
//! - `content`: Queue, library and suggestion panes
//! - `progress`: Now-playing bar
//! - `overlays`: Modal overlays (error, help)

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{ContentState, PlaybackInfo, UiState};

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, playback: &PlaybackInfo, ui_state: &UiState, content_state: &ContentState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Enhancement + stream status
                Constraint::Min(0),    // Panes
                Constraint::Length(3), // Now playing
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], playback);

        // Middle: Queue on the left, Library above Suggestions on the right
        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        content::render_queue(frame, main_chunks[0], ui_state, content_state);

        let side_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[1]);

        let current_track = playback.track.as_ref().map(|t| t.id);
        content::render_library(frame, side_chunks[0], ui_state, content_state, current_track);
        content::render_suggestions(frame, side_chunks[1], ui_state, content_state);

        progress::render_now_playing(frame, chunks[2], playback);

        if ui_state.error_message.is_some() {
            overlays::render_error_notification(frame, ui_state);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }
    }
}
