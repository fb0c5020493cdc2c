use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::{
    app::{App, Detail},
    comments::Row,
    model::MediaKind,
    optimistic::LikeState,
};

use super::widgets::{dim, header, highlight, likes, list_state, timestamp};

pub fn render<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let Some(detail) = app.detail() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_post(f, app, detail, chunks[0]);
    render_thread(f, detail, chunks[1]);
}

fn render_post<B: Backend>(f: &mut Frame<B>, app: &App, detail: &Detail, area: Rect) {
    let block = Block::default()
        .title(format!("Post #{}", detail.post_id))
        .borders(Borders::ALL);

    let Some(post) = &detail.post else {
        let message = detail.error.as_deref().unwrap_or("Loading…");
        f.render_widget(Paragraph::new(message).style(dim()).block(block), area);
        return;
    };

    let feed = app.feed();
    let like = if feed.contains(post.id) {
        likes(feed.like(post.id), feed.like_pending(post.id))
    } else {
        likes(LikeState::new(post.like_count, post.is_liked), false)
    };

    let mut lines = vec![
        Line::from(Span::styled(
            post.title.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(post.author(), header()),
            Span::styled(format!("  {}", timestamp(&post.created_at)), dim()),
            Span::raw(format!("  {}", like)),
        ]),
    ];
    if !post.tags.is_empty() {
        let tags: Vec<String> = post.tags.iter().map(|tag| format!("#{}", tag.name)).collect();
        lines.push(Line::from(Span::styled(
            tags.join(" "),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::from(""));
    lines.extend(post.plain_content().lines().map(|line| Line::from(line.to_string())));

    for url in [&post.image_url, &post.video_url].into_iter().flatten() {
        let kind = match MediaKind::from_url(url) {
            Some(MediaKind::Video) => "video",
            _ => "image",
        };
        lines.push(Line::from(Span::styled(
            format!("[{}] {}", kind, url),
            Style::default().fg(Color::Magenta),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_thread<B: Backend>(f: &mut Frame<B>, detail: &Detail, area: Rect) {
    let title = "Comments · enter expand · l like · r reply · c comment";
    let block = Block::default().title(title).borders(Borders::ALL);

    let Some(thread) = &detail.thread else {
        f.render_widget(Paragraph::new("Loading comments…").style(dim()).block(block), area);
        return;
    };
    if thread.is_empty() {
        f.render_widget(Paragraph::new("No comments yet.").style(dim()).block(block), area);
        return;
    }

    let rows = thread.rows();
    let items: Vec<ListItem> = rows.iter().map(comment_item).collect();
    let list = List::new(items).block(block).highlight_style(highlight());
    let mut state = list_state(detail.cursor.index_in(&detail.row_ids()));
    f.render_stateful_widget(list, area, &mut state);
}

fn comment_item(row: &Row) -> ListItem<'static> {
    let indent = "  ".repeat(row.depth);
    let marker = match (row.loading, row.expanded) {
        (true, _) => "… ",
        (false, true) => "▾ ",
        (false, false) => "▸ ",
    };

    let mut lines = vec![Line::from(vec![
        Span::raw(format!("{}{}", indent, marker)),
        Span::styled(row.comment.author(), header()),
        Span::styled(format!("  {}", timestamp(&row.comment.created_at)), dim()),
        Span::raw(format!("  {}", likes(row.like, false))),
    ])];
    lines.extend(
        row.comment
            .text
            .lines()
            .map(|line| Line::from(format!("{}  {}", indent, line))),
    );
    ListItem::new(lines)
}
