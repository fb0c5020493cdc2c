use ratatui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{reports::ReportGroup, App};

use super::widgets::{dim, header, highlight, list_state, timestamp};

pub fn render<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let moderation = app.moderation();
    let block = Block::default()
        .title("Reported posts · enter open · d delete · R reload")
        .borders(Borders::ALL);

    if moderation.groups.is_empty() {
        let message = if moderation.loading {
            "Loading reports…"
        } else {
            "No reports."
        };
        f.render_widget(Paragraph::new(message).style(dim()).block(block), area);
        return;
    }

    let items: Vec<ListItem> = moderation
        .groups
        .iter()
        .map(|group| group_item(app, group))
        .collect();
    let list = List::new(items).block(block).highlight_style(highlight());
    let mut state = list_state(moderation.cursor.index_in(&moderation.ids()));
    f.render_stateful_widget(list, area, &mut state);
}

fn group_item(app: &App, group: &ReportGroup) -> ListItem<'static> {
    let title = app
        .feed()
        .get(group.post_id)
        .map(|post| format!("{} by {}", post.title, post.author()))
        .unwrap_or_else(|| format!("post #{}", group.post_id));
    let latest = group
        .latest()
        .map(|at| format!("  last {}", timestamp(&at)))
        .unwrap_or_default();

    let mut lines = vec![Line::from(vec![
        Span::styled(title, header()),
        Span::styled(
            format!("  {} report(s)", group.count()),
            Style::default().fg(Color::Red),
        ),
        Span::styled(latest, dim()),
    ])];
    for reason in group.reasons() {
        lines.push(Line::from(format!("  - {}", reason)));
    }
    let contacts: Vec<&str> = group
        .reports
        .iter()
        .filter_map(|report| report.email.as_deref())
        .collect();
    if !contacts.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  contact: {}", contacts.join(", ")),
            dim(),
        )));
    }
    ListItem::new(lines)
}
