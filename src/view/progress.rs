//! Now-playing bar rendering

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

use crate::audio::BindingStatus;
use crate::model::PlaybackInfo;
use super::utils::format_duration;

pub fn render_now_playing(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    let status_text = match &playback.track {
        None => " No track playing".to_string(),
        Some(track) => {
            let icon = if playback.binding.status == BindingStatus::Playing { "▶" } else { "⏸" };
            let album = track.album.as_deref().map(|a| format!(" ({})", a)).unwrap_or_default();
            format!(" {} {} | {}{}", icon, track.title, track.artist, album)
        }
    };

    let body = match (&playback.track, playback.binding.error) {
        (_, Some(kind)) if playback.binding.status == BindingStatus::Error => {
            Line::from(kind.to_string()).style(Style::default().fg(Color::Red))
        }
        (Some(track), _) => Line::from(format!(
            "{}   {}",
            format_duration(track.duration_secs),
            playback.binding.locator.as_deref().unwrap_or("")
        ))
        .style(Style::default().fg(Color::DarkGray)),
        (None, _) => Line::from(""),
    };

    let shuffle_text = if playback.shuffled { "Shuffle: On" } else { "Shuffle: Off" };
    let repeat_text = format!("Repeat: {}", playback.repeat_mode.label());
    let sync_text = if playback.awaiting_confirmation { " | Syncing" } else { "" };
    let controls_info = format!(" {} | {}{} ", shuffle_text, repeat_text, sync_text);

    let widget = Paragraph::new(body).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ", status_text))
            .title_bottom(Line::from(controls_info).right_aligned())
            .padding(Padding::horizontal(1)),
    );

    frame.render_widget(widget, area);
}
