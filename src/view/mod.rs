pub mod composer;
pub mod detail;
pub mod feed;
pub mod reports;
pub mod tui;
pub mod widgets;

use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{alerts::Level, App, Connection, Overlay, Screen};

use widgets::dim;

const TOAST_WIDTH: u16 = 48;

pub fn render<B: Backend>(f: &mut Frame<B>, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.size());

    match app.screen() {
        Screen::Feed => feed::render(f, app, chunks[0]),
        Screen::Detail => detail::render(f, app, chunks[0]),
        Screen::Reports => reports::render(f, app, chunks[0]),
    }
    render_status(f, app, chunks[1]);

    match app.overlay() {
        Some(Overlay::Composer(composer)) => composer::render_composer(f, composer),
        Some(Overlay::Filter { input, error, .. }) => {
            composer::render_filter(f, input, error.as_deref())
        }
        Some(Overlay::Help) => composer::render_help(f),
        None => {}
    }

    render_alerts(f, app);
}

fn render_status<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let connection = match app.connection() {
        Connection::Connecting => Span::styled("● connecting", Style::default().fg(Color::Yellow)),
        Connection::Online => Span::styled("● live", Style::default().fg(Color::Green)),
        Connection::Offline { retry_in } => Span::styled(
            format!("● offline, retrying in {}s", retry_in.as_secs()),
            Style::default().fg(Color::Red),
        ),
    };

    let mut spans = vec![connection];
    if app.is_loading() {
        spans.push(Span::styled("  loading…", dim()));
    }
    if app.is_admin() {
        spans.push(Span::styled("  admin", dim()));
    }
    spans.push(Span::styled("  ? help · q quit", dim()));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_alerts<B: Backend>(f: &mut Frame<B>, app: &App) {
    let size = f.size();
    let width = TOAST_WIDTH.min(size.width);
    let mut y = size.y + 1;

    for alert in app.alerts().iter() {
        let height = 3;
        if y + height > size.height {
            break;
        }
        let area = Rect {
            x: size.width.saturating_sub(width + 1),
            y,
            width,
            height,
        };
        let color = match alert.level {
            Level::Info => Color::Green,
            Level::Error => Color::Red,
        };
        f.render_widget(Clear, area);
        let toast = Paragraph::new(alert.message.as_str())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            );
        f.render_widget(toast, area);
        y += height;
    }
}
