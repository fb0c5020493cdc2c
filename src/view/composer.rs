use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::{
    app::composer::Composer,
    model::MediaKind,
};

use super::widgets::{centered_rect, dim, header};

pub fn render_composer<B: Backend>(f: &mut Frame<B>, composer: &Composer) {
    let area = centered_rect(70, 70, f.size());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(composer.kind.title())
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut constraints: Vec<Constraint> = composer
        .fields
        .iter()
        .map(|field| {
            if field.multiline {
                Constraint::Min(5)
            } else {
                Constraint::Length(3)
            }
        })
        .collect();
    constraints.push(Constraint::Length(2));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (index, field) in composer.fields.iter().enumerate() {
        let focused = index == composer.focus;
        let mut label = field.label.to_string();
        if field.required {
            label.push_str(" *");
        }
        if field.label == "Media URL" && !field.value.trim().is_empty() {
            label.push_str(match composer.media() {
                Some(MediaKind::Image) => " (image)",
                Some(MediaKind::Video) => " (video)",
                None => " (unknown type)",
            });
        }

        let style = if focused { header() } else { Style::default() };
        let mut value = field.value.clone();
        if focused {
            value.push('▏');
        }
        let input = Paragraph::new(value)
            .wrap(Wrap { trim: false })
            .block(Block::default().title(label).borders(Borders::ALL).border_style(style));
        f.render_widget(input, chunks[index]);
    }

    let footer = match (&composer.error, composer.submitting) {
        (Some(error), _) => Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red))),
        (None, true) => Line::from(Span::styled("Sending…", dim())),
        (None, false) => Line::from(Span::styled(
            "tab next field · ctrl+s submit · esc cancel",
            dim(),
        )),
    };
    if let Some(area) = chunks.last() {
        f.render_widget(Paragraph::new(footer), *area);
    }
}

pub fn render_filter<B: Backend>(f: &mut Frame<B>, input: &str, error: Option<&str>) {
    let size = f.size();
    let area = Rect {
        x: size.x,
        y: size.height.saturating_sub(5),
        width: size.width,
        height: 4.min(size.height),
    };
    f.render_widget(Clear, area);

    let hint = error.map_or_else(
        || Span::styled("text from:YYYY-MM-DD to:YYYY-MM-DD user:ID · enter search · esc cancel", dim()),
        |error| Span::styled(error, Style::default().fg(Color::Red)),
    );
    let text = vec![Line::from(format!("/{}▏", input)), Line::from(hint)];
    let paragraph = Paragraph::new(text).block(Block::default().title("Filter").borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

const HELP: &[(&str, &str)] = &[
    ("j/k ↑/↓", "move"),
    ("g / G", "top (shows new posts) / bottom"),
    ("enter", "open post / expand replies"),
    ("l / L", "like selection / like post"),
    ("n", "new post"),
    ("c / r", "comment / reply"),
    ("e / E", "edit selection / edit post"),
    ("d / D", "delete selection / delete post"),
    ("!", "report post"),
    ("/ / x", "filter / clear filter"),
    ("R", "reload"),
    ("m", "moderation (admin)"),
    ("esc", "back"),
    ("q", "quit"),
];

pub fn render_help<B: Backend>(f: &mut Frame<B>) {
    let area = centered_rect(50, 60, f.size());
    f.render_widget(Clear, area);
    let lines: Vec<Line> = HELP
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{:>10}  ", keys), header()),
                Span::raw(*what),
            ])
        })
        .collect();
    let paragraph = Paragraph::new(lines).block(Block::default().title("Keys").borders(Borders::ALL));
    f.render_widget(paragraph, area);
}
