//! Top bar rendering (enhancement tier and stream status)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

use crate::audio::BindingStatus;
use crate::model::PlaybackInfo;

pub fn render_top_bar(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Enhancement tier
            Constraint::Length(30), // Stream status
        ])
        .split(area);

    let enhancement = &playback.enhancement;
    let (tier_text, tier_style) = if enhancement.enabled {
        (
            format!("Remastered · {} · intensity {:.1}", enhancement.preset, enhancement.intensity),
            Style::default().fg(Color::Magenta),
        )
    } else {
        (
            format!("Original · next preset {} (e to enable)", enhancement.preset),
            Style::default().fg(Color::DarkGray),
        )
    };
    let tier = Paragraph::new(tier_text).style(tier_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Enhancement ")
            .padding(Padding::horizontal(1)),
    );
    frame.render_widget(tier, chunks[0]);

    let binding = &playback.binding;
    let status_color = match binding.status {
        BindingStatus::Idle => Color::DarkGray,
        BindingStatus::Loading => Color::Yellow,
        BindingStatus::Ready => Color::White,
        BindingStatus::Playing => Color::Green,
        BindingStatus::Error => Color::Red,
    };
    let status = Paragraph::new(binding.status.label())
        .style(Style::default().fg(status_color))
        .block(Block::default().borders(Borders::ALL).title(" Stream ").padding(Padding::horizontal(1)));
    frame.render_widget(status, chunks[1]);
}
