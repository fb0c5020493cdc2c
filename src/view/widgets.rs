use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::ListState,
};

use crate::optimistic::LikeState;

/// List state selecting `index`, for lists whose selection lives in the store.
pub fn list_state(index: Option<usize>) -> ListState {
    let mut state = ListState::default();
    state.select(index);
    state
}

pub fn highlight() -> Style {
    Style::default()
        .bg(Color::Gray)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

pub fn header() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

pub fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn likes(state: LikeState, pending: bool) -> String {
    let heart = if state.liked { "♥" } else { "♡" };
    let pending = if pending { "…" } else { "" };
    format!("{} {}{}", heart, state.count, pending)
}

/// First `lines` non-empty lines of `text`, each cut to `width` characters.
pub fn excerpt(text: &str, lines: usize, width: usize) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(lines)
        .map(|line| {
            if line.chars().count() > width {
                let cut: String = line.chars().take(width.saturating_sub(1)).collect();
                format!("{}…", cut)
            } else {
                line.to_string()
            }
        })
        .collect()
}
