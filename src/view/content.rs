//! Pane rendering (queue, library, suggestions)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, ListItem, Padding},
    Frame,
};

use crate::model::{ActivePane, ContentState, Track, TrackId, UiState};
use super::utils::{border_style, calculate_num_width, format_duration, render_scrollable_list, truncate_string};

fn row_style(is_selected: bool, is_focused: bool, is_playing: bool) -> Style {
    if is_selected && is_focused {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if is_playing {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else if is_selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn track_items(
    tracks: &[Track],
    selected_index: usize,
    is_focused: bool,
    current_index: Option<usize>,
    content_width: usize,
) -> Vec<ListItem<'static>> {
    let num_width = calculate_num_width(tracks.len());
    let duration_width = 6;
    let fixed_width = 1 + num_width + 3 + 3 + 3 + duration_width;
    let remaining_width = content_width.saturating_sub(fixed_width);
    let title_width = (remaining_width * 55) / 100;
    let artist_width = remaining_width.saturating_sub(title_width);

    // Create header as first item
    let mut items: Vec<ListItem<'static>> = vec![
        ListItem::new(format!(
            " {:<num_width$}   {:<title_width$}   {:<artist_width$}   {}",
            "#", "Title", "Artist", "Time",
            num_width = num_width,
            title_width = title_width,
            artist_width = artist_width
        ))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    ];

    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let is_playing = current_index == Some(i);
        let playing_indicator = if is_playing { "▶" } else { " " };
        let track_num = format!("{}{:<num_width$}", playing_indicator, i + 1, num_width = num_width);
        ListItem::new(format!(
            "{}   {}   {}   {}",
            track_num,
            truncate_string(&track.title, title_width),
            truncate_string(&track.artist, artist_width),
            format_duration(track.duration_secs)
        ))
        .style(row_style(i == selected_index, is_focused, is_playing))
    }));
    items
}

pub fn render_queue(frame: &mut Frame, area: Rect, ui_state: &UiState, content: &ContentState) {
    let is_focused = ui_state.active_pane == ActivePane::Queue;
    let queue = &content.queue;
    let content_width = area.width.saturating_sub(4) as usize;

    let mut list_items = track_items(
        queue.tracks(),
        ui_state.queue_selected,
        is_focused,
        queue.current_index(),
        content_width,
    );
    if queue.is_empty() {
        list_items.push(
            ListItem::new("       Queue is empty")
                .style(Style::default().fg(Color::DarkGray)),
        );
    }

    let title = if content.queue_pending {
        format!(" Queue ({}) · syncing… ", queue.len())
    } else {
        format!(" Queue ({}) ", queue.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding::horizontal(1))
        .border_style(border_style(is_focused));

    render_scrollable_list(frame, area, list_items, ui_state.queue_selected + 1, block);
}

pub fn render_library(
    frame: &mut Frame,
    area: Rect,
    ui_state: &UiState,
    content: &ContentState,
    current_track: Option<TrackId>,
) {
    let is_focused = ui_state.active_pane == ActivePane::Library;
    let content_width = area.width.saturating_sub(4) as usize;
    let current_index = current_track.and_then(|id| content.library.iter().position(|t| t.id == id));

    let mut list_items = track_items(
        &content.library,
        ui_state.library_selected,
        is_focused,
        current_index,
        content_width,
    );
    let footer = if content.library_loading {
        Some("       Loading…")
    } else if content.library_has_more {
        Some("       Press n to load more")
    } else if content.library.is_empty() {
        Some("       Library is empty")
    } else {
        None
    };
    if let Some(footer) = footer {
        list_items.push(ListItem::new(footer).style(Style::default().fg(Color::DarkGray)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Library ({}) ", content.library.len()))
        .padding(Padding::horizontal(1))
        .border_style(border_style(is_focused));

    render_scrollable_list(frame, area, list_items, ui_state.library_selected + 1, block);
}

pub fn render_suggestions(frame: &mut Frame, area: Rect, ui_state: &UiState, content: &ContentState) {
    let is_focused = ui_state.active_pane == ActivePane::Suggestions;
    let width = area.width.saturating_sub(4) as usize;

    let mut list_items: Vec<ListItem> = content
        .suggestions
        .iter()
        .enumerate()
        .map(|(i, suggestion)| {
            let label = format!("{} - {}", suggestion.track.title, suggestion.track.artist);
            let reason_width = width / 2;
            let label_width = width.saturating_sub(reason_width + 3);
            ListItem::new(format!(
                "{}   {}",
                truncate_string(&label, label_width),
                truncate_string(&suggestion.reason, reason_width)
            ))
            .style(row_style(i == ui_state.suggestion_selected, is_focused, false))
        })
        .collect();

    if list_items.is_empty() {
        list_items.push(
            ListItem::new("Load your library to get suggestions")
                .style(Style::default().fg(Color::DarkGray)),
        );
    }

    let title = match content.history.first() {
        Some(last) => format!(
            " Play Next · last played {} - {} at {} ",
            last.title,
            last.artist,
            last.played_at.format("%H:%M")
        ),
        None => " Play Next ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding::horizontal(1))
        .border_style(border_style(is_focused));

    render_scrollable_list(frame, area, list_items, ui_state.suggestion_selected, block);
}
