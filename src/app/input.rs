use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;

use crate::{
    comments::Expand,
    feed::FeedFilter,
};

use super::{composer::Composer, App, Effect, Overlay, Screen};

const PAGE: isize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Back,
    Move(isize),
    Top,
    Bottom,
    /// Enter on a list row: open a post or expand a comment.
    Open,
    Like,
    LikePost,
    Delete,
    DeletePost,
    Edit,
    EditPost,
    NewPost,
    Comment,
    Reply,
    Report,
    Refresh,
    Filter,
    ClearFilter,
    Moderation,
    Help,
    // overlays
    Type(char),
    Backspace,
    Enter,
    NextField,
    PreviousField,
    Submit,
    Cancel,
}

/// Key bindings depend on what has the focus.
pub fn action(app: &App, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    match app.overlay() {
        Some(Overlay::Help) => return Some(Action::Cancel),
        Some(Overlay::Composer(_) | Overlay::Filter { .. }) => {
            return match key.code {
                KeyCode::Esc => Some(Action::Cancel),
                KeyCode::Char('s') if ctrl => Some(Action::Submit),
                KeyCode::Char(c) if !ctrl => Some(Action::Type(c)),
                KeyCode::Backspace => Some(Action::Backspace),
                KeyCode::Enter => Some(Action::Enter),
                KeyCode::Tab => Some(Action::NextField),
                KeyCode::BackTab => Some(Action::PreviousField),
                _ => None,
            }
        }
        None => {}
    }

    let action = match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc | KeyCode::Backspace => Action::Back,
        KeyCode::Down | KeyCode::Char('j') => Action::Move(1),
        KeyCode::Up | KeyCode::Char('k') => Action::Move(-1),
        KeyCode::PageDown => Action::Move(PAGE),
        KeyCode::PageUp => Action::Move(-PAGE),
        KeyCode::Home | KeyCode::Char('g') => Action::Top,
        KeyCode::End | KeyCode::Char('G') => Action::Bottom,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Open,
        KeyCode::Char('l') => Action::Like,
        KeyCode::Char('L') => Action::LikePost,
        KeyCode::Char('d') => Action::Delete,
        KeyCode::Char('D') => Action::DeletePost,
        KeyCode::Char('e') => Action::Edit,
        KeyCode::Char('E') => Action::EditPost,
        KeyCode::Char('n') => Action::NewPost,
        KeyCode::Char('c') => Action::Comment,
        KeyCode::Char('r') => Action::Reply,
        KeyCode::Char('!') => Action::Report,
        KeyCode::Char('R') | KeyCode::F(5) => Action::Refresh,
        KeyCode::Char('/') => Action::Filter,
        KeyCode::Char('x') => Action::ClearFilter,
        KeyCode::Char('m') => Action::Moderation,
        KeyCode::Char('?') => Action::Help,
        _ => return None,
    };
    Some(action)
}

impl App {
    pub fn perform(&mut self, action: Action) -> Vec<Effect> {
        if self.overlay.is_some() {
            return self.perform_overlay(action);
        }
        match action {
            Action::Quit => {
                self.quit = true;
                vec![]
            }
            Action::Help => {
                self.overlay = Some(Overlay::Help);
                vec![]
            }
            Action::Refresh => match self.screen {
                Screen::Reports => self.load_reports(),
                Screen::Detail => match self.detail_post() {
                    Some(id) => self.open_detail(id),
                    None => vec![],
                },
                Screen::Feed => self.refresh(),
            },
            Action::NewPost => {
                self.overlay = Some(Overlay::Composer(Composer::new_post()));
                vec![]
            }
            Action::Moderation => {
                if self.admin {
                    self.screen = Screen::Reports;
                    self.load_reports()
                } else {
                    self.alerts.error("The moderation screen needs --admin");
                    vec![]
                }
            }
            _ => match self.screen {
                Screen::Feed => self.perform_feed(action),
                Screen::Detail => self.perform_detail(action),
                Screen::Reports => self.perform_reports(action),
            },
        }
    }

    fn perform_feed(&mut self, action: Action) -> Vec<Effect> {
        let ids = self.feed_ids();
        self.feed_cursor.resolve(&ids);
        match action {
            Action::Move(delta) => {
                self.feed_cursor.move_by(&ids, delta);
                self.sync_viewport();
            }
            Action::Top => {
                self.feed_cursor.top(&ids);
                self.sync_viewport();
            }
            Action::Bottom => {
                self.feed_cursor.move_by(&ids, isize::MAX);
                self.sync_viewport();
            }
            Action::Back => {
                if !self.feed.filter().is_empty() {
                    return self.clear_filter();
                }
            }
            Action::Filter => {
                let previous = self.feed.filter().clone();
                self.overlay = Some(Overlay::Filter {
                    input: previous.to_string(),
                    previous,
                    error: None,
                });
            }
            Action::ClearFilter => return self.clear_filter(),
            _ => {
                if let Some(id) = self.feed_cursor.selected() {
                    return self.perform_on_post(id, action);
                }
            }
        }
        vec![]
    }

    fn perform_detail(&mut self, action: Action) -> Vec<Effect> {
        let Some(detail) = self.detail.as_mut() else {
            self.screen = self.back_to;
            return vec![];
        };
        let post_id = detail.post_id;
        let ids = detail.row_ids();
        detail.cursor.resolve(&ids);

        match action {
            Action::Back => self.close_detail(),
            Action::Move(delta) => {
                detail.cursor.move_by(&ids, delta);
            }
            Action::Top => detail.cursor.top(&ids),
            Action::Bottom => {
                detail.cursor.move_by(&ids, isize::MAX);
            }
            Action::Open => {
                let (Some(thread), Some(id)) = (detail.thread.as_mut(), detail.cursor.selected())
                else {
                    return vec![];
                };
                if let Expand::Fetch(parent) = thread.toggle(id) {
                    return vec![Effect::LoadReplies { post_id, parent }];
                }
            }
            Action::Like => {
                let (Some(thread), Some(id)) = (detail.thread.as_mut(), detail.cursor.selected())
                else {
                    return vec![];
                };
                if let Some(state) = thread.begin_like_toggle(id) {
                    return vec![Effect::LikeComment {
                        post_id,
                        comment_id: id,
                        like: state.liked,
                    }];
                }
            }
            Action::Reply => {
                if let Some(comment) = detail.selected_comment() {
                    let composer = Composer::comment(post_id, Some(comment.id));
                    self.overlay = Some(Overlay::Composer(composer));
                }
            }
            Action::Edit | Action::Delete => {
                let Some(comment) = detail.selected_comment().cloned() else {
                    return vec![];
                };
                if !self.can_modify(comment.user_id) {
                    self.alerts.error("You can only change your own comments");
                    return vec![];
                }
                if action == Action::Edit {
                    self.overlay = Some(Overlay::Composer(Composer::edit_comment(&comment)));
                    return vec![];
                }
                let begun = self
                    .thread_mut(post_id)
                    .map_or(false, |thread| thread.begin_delete(comment.id));
                if begun {
                    return vec![Effect::DeleteComment {
                        post_id,
                        comment_id: comment.id,
                    }];
                }
            }
            Action::LikePost => return self.perform_on_post(post_id, Action::Like),
            Action::EditPost => return self.perform_on_post(post_id, Action::Edit),
            Action::DeletePost => return self.perform_on_post(post_id, Action::Delete),
            Action::Comment | Action::Report => return self.perform_on_post(post_id, action),
            _ => {}
        }
        vec![]
    }

    fn perform_reports(&mut self, action: Action) -> Vec<Effect> {
        let ids = self.moderation.ids();
        match action {
            Action::Back => self.screen = Screen::Feed,
            Action::Move(delta) => {
                self.moderation.cursor.move_by(&ids, delta);
            }
            Action::Top => self.moderation.cursor.top(&ids),
            Action::Bottom => {
                self.moderation.cursor.move_by(&ids, isize::MAX);
            }
            Action::Open => {
                if let Some(id) = self.moderation.selected().map(|group| group.post_id) {
                    return self.open_detail(id);
                }
            }
            Action::Delete | Action::DeletePost => {
                if let Some(id) = self.moderation.selected().map(|group| group.post_id) {
                    return self.delete_post(id);
                }
            }
            _ => {}
        }
        vec![]
    }

    /// Post actions shared by the feed and the detail screen.
    fn perform_on_post(&mut self, id: i64, action: Action) -> Vec<Effect> {
        let post = self
            .feed
            .get(id)
            .or_else(|| self.detail.as_ref().and_then(|detail| detail.post.as_ref()))
            .filter(|post| post.id == id)
            .cloned();

        match action {
            Action::Open => return self.open_detail(id),
            Action::Like => match self.feed.begin_like_toggle(id) {
                Some(state) => {
                    return vec![Effect::LikePost {
                        post_id: id,
                        like: state.liked,
                    }]
                }
                None if self.feed.like_pending(id) => debug!("Like on {} still pending", id),
                None => self.alerts.error("Only posts in the feed can be liked"),
            },
            Action::Comment => {
                self.overlay = Some(Overlay::Composer(Composer::comment(id, None)));
            }
            Action::Report => {
                self.overlay = Some(Overlay::Composer(Composer::report(id)));
            }
            Action::Edit | Action::Delete => {
                let Some(post) = post else {
                    return vec![];
                };
                if !self.can_modify(post.user_id) {
                    self.alerts.error("You can only change your own posts");
                    return vec![];
                }
                if action == Action::Edit {
                    self.overlay = Some(Overlay::Composer(Composer::edit_post(&post)));
                    return vec![];
                }
                return self.delete_post(id);
            }
            _ => {}
        }
        vec![]
    }

    fn perform_overlay(&mut self, action: Action) -> Vec<Effect> {
        let Some(overlay) = self.overlay.as_mut() else {
            return vec![];
        };

        match overlay {
            Overlay::Help => self.overlay = None,
            Overlay::Composer(composer) => match action {
                Action::Cancel => self.overlay = None,
                Action::Type(c) => composer.input(c),
                Action::Backspace => composer.backspace(),
                Action::Enter => composer.enter(),
                Action::NextField => composer.next_field(),
                Action::PreviousField => composer.previous_field(),
                Action::Submit if !composer.submitting => {
                    if let Ok(effect) = composer.submit() {
                        return vec![effect];
                    }
                }
                _ => {}
            },
            Overlay::Filter {
                input,
                previous,
                error,
            } => match action {
                Action::Cancel => {
                    let previous = previous.clone();
                    self.feed.set_filter(previous);
                    self.overlay = None;
                }
                Action::Type(c) => {
                    input.push(c);
                    *error = preview(&mut self.feed, input);
                }
                Action::Backspace => {
                    input.pop();
                    *error = preview(&mut self.feed, input);
                }
                Action::Enter | Action::Submit => match FeedFilter::parse(input) {
                    Ok(filter) => {
                        self.overlay = None;
                        self.feed.set_filter(filter);
                        return self.refresh();
                    }
                    Err(err) => *error = Some(err.to_string()),
                },
                _ => {}
            },
        }
        vec![]
    }

    fn clear_filter(&mut self) -> Vec<Effect> {
        self.feed.set_filter(FeedFilter::default());
        self.refresh()
    }

    fn load_reports(&mut self) -> Vec<Effect> {
        self.moderation.loading = true;
        vec![Effect::LoadReports]
    }
}

/// Applies a parsable filter locally while typing.
fn preview(feed: &mut crate::feed::FeedReconciler, input: &str) -> Option<String> {
    match FeedFilter::parse(input) {
        Ok(filter) => {
            feed.set_filter(filter);
            None
        }
        Err(err) => Some(err.to_string()),
    }
}
