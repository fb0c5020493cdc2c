use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::{app::App, model::Post};

use super::widgets::{dim, excerpt, header, highlight, likes, list_state, timestamp};

const TAGS_SHOWN: usize = 12;

pub fn render<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(28)])
        .split(area);

    render_posts(f, app, chunks[0]);
    render_tags(f, app, chunks[1]);
}

fn render_posts<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let feed = app.feed();
    let width = area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = feed
        .visible()
        .into_iter()
        .map(|post| post_item(app, post, width))
        .collect();

    let mut title = String::from("Feed");
    if !feed.filter().is_empty() {
        title.push_str(&format!(" [{}]", feed.filter()));
    }
    if feed.pending_count() > 0 {
        title.push_str(&format!(" · {} new ↑ (g)", feed.pending_count()));
    }

    if items.is_empty() {
        let message = if app.is_loading() {
            "Loading…"
        } else {
            "Nothing here yet. Press n to write the first post."
        };
        let empty = Paragraph::new(message)
            .style(dim())
            .block(Block::default().title(title).borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    }

    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(highlight());
    let mut state = list_state(app.feed_index());
    f.render_stateful_widget(list, area, &mut state);
}

fn post_item<'a>(app: &App, post: &'a Post, width: usize) -> ListItem<'a> {
    let feed = app.feed();
    let like = likes(feed.like(post.id), feed.like_pending(post.id));

    let mut lines = vec![
        Line::from(vec![
            Span::styled(post.author(), header()),
            Span::styled(format!("  {}", timestamp(&post.created_at)), dim()),
            Span::raw(format!("  {}  💬 {}", like, feed.comment_count(post.id))),
        ]),
        Line::from(Span::styled(
            post.title.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    lines.extend(
        excerpt(&post.plain_content(), 2, width)
            .into_iter()
            .map(Line::from),
    );

    let mut extras = vec![];
    if post.image_url.is_some() {
        extras.push(Span::styled("[image] ", Style::default().fg(Color::Magenta)));
    }
    if post.video_url.is_some() {
        extras.push(Span::styled("[video] ", Style::default().fg(Color::Magenta)));
    }
    for tag in &post.tags {
        extras.push(Span::styled(format!("#{} ", tag.name), Style::default().fg(Color::Yellow)));
    }
    if !extras.is_empty() {
        lines.push(Line::from(extras));
    }
    lines.push(Line::from(""));

    ListItem::new(lines)
}

fn render_tags<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .tag_panel(TAGS_SHOWN)
        .into_iter()
        .map(|(name, count)| {
            Line::from(vec![
                Span::styled(format!("#{}", name), Style::default().fg(Color::Yellow)),
                Span::styled(format!(" {}", count), dim()),
            ])
        })
        .collect();

    let panel = Paragraph::new(lines).block(
        Block::default()
            .title("Popular tags")
            .borders(Borders::ALL),
    );
    f.render_widget(panel, area);
}
