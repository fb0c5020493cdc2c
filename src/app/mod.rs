pub mod alerts;
pub mod composer;
pub mod cursor;
pub mod effects;
pub mod input;
pub mod reports;
pub mod run;

use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use crossterm::event::KeyEvent;
use log::{debug, info, warn};
use tokio::task::AbortHandle;

use crate::{
    comments::CommentThread,
    error::{FeedError, Result},
    feed::{Created, FeedFilter, FeedReconciler},
    latest::{Latest, Ticket},
    model::{Comment, CommentId, Post, PostDetail, PostId, Report, Tag, UserId},
    push::{FeedEvent, PushMessage},
};

use alerts::Alerts;
use composer::{Composer, ComposerKind};
use cursor::Cursor;
use effects::LikeOutcome;
use reports::Moderation;

pub use effects::{Effect, Superseding};

/// Everything the store reacts to, in arrival order.
#[derive(Debug)]
pub enum AppMessage {
    Key(KeyEvent),
    Push(PushMessage),
    /// Reload or search results, both replace the feed.
    Posts {
        ticket: Ticket,
        result: Result<Vec<Post>>,
    },
    Tags {
        ticket: Ticket,
        result: Result<Vec<Tag>>,
    },
    Detail {
        post_id: PostId,
        result: Result<PostDetail>,
    },
    Replies {
        post_id: PostId,
        parent: CommentId,
        result: Result<Vec<Comment>>,
    },
    PostLiked {
        post_id: PostId,
        result: LikeOutcome,
    },
    CommentLiked {
        post_id: PostId,
        comment_id: CommentId,
        result: LikeOutcome,
    },
    PostDeleted {
        post_id: PostId,
        result: Result<()>,
    },
    PostSaved {
        editing: Option<PostId>,
        result: Result<Option<Post>>,
    },
    CommentCreated {
        post_id: PostId,
        result: Result<Option<Comment>>,
    },
    CommentEdited {
        post_id: PostId,
        comment_id: CommentId,
        text: String,
        result: Result<()>,
    },
    CommentDeleted {
        post_id: PostId,
        comment_id: CommentId,
        result: Result<()>,
    },
    Reported {
        post_id: PostId,
        result: Result<()>,
    },
    Reports(Result<Vec<Report>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Feed,
    Detail,
    Reports,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Composer(Composer),
    Filter {
        input: String,
        previous: FeedFilter,
        error: Option<String>,
    },
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Connecting,
    Online,
    Offline { retry_in: Duration },
}

/// An opened post with its comment thread.
#[derive(Debug, Clone)]
pub struct Detail {
    pub post_id: PostId,
    pub post: Option<Post>,
    pub thread: Option<CommentThread>,
    pub cursor: Cursor,
    pub error: Option<String>,
}

impl Detail {
    fn loading(post_id: PostId, post: Option<Post>) -> Self {
        Self {
            post_id,
            post,
            thread: None,
            cursor: Cursor::default(),
            error: None,
        }
    }

    pub fn row_ids(&self) -> Vec<i64> {
        self.thread.as_ref().map_or(vec![], |thread| {
            thread.rows().iter().map(|row| row.comment.id).collect()
        })
    }

    pub fn selected_comment(&self) -> Option<&Comment> {
        let id = self.cursor.selected()?;
        self.thread.as_ref()?.get(id)
    }
}

/// The single owner of UI state. Every change happens in [`App::update`] on
/// the store task; work that needs the network is handed back as [`Effect`]s.
#[derive(Debug)]
pub struct App {
    feed: FeedReconciler,
    feed_cursor: Cursor,
    screen: Screen,
    back_to: Screen,
    detail: Option<Detail>,
    moderation: Moderation,
    /// Posts with a DELETE in flight, wherever it was started from.
    deleting: HashSet<PostId>,
    overlay: Option<Overlay>,
    alerts: Alerts,
    tags: Vec<Tag>,
    connection: Connection,
    search: Latest,
    tag_request: Latest,
    loading: bool,
    user_id: Option<UserId>,
    admin: bool,
    quit: bool,
}

impl App {
    pub fn new(user_id: Option<UserId>, admin: bool) -> Self {
        Self {
            feed: FeedReconciler::new(),
            feed_cursor: Cursor::default(),
            screen: Screen::Feed,
            back_to: Screen::Feed,
            detail: None,
            moderation: Moderation::default(),
            deleting: HashSet::new(),
            overlay: None,
            alerts: Alerts::default(),
            tags: vec![],
            connection: Connection::Connecting,
            search: Latest::default(),
            tag_request: Latest::default(),
            loading: false,
            user_id,
            admin,
            quit: false,
        }
    }

    /// Initial fetches.
    pub fn start(&mut self) -> Vec<Effect> {
        self.refresh()
    }

    //==========================================================================
    // Reads for the views
    //==========================================================================
    pub fn feed(&self) -> &FeedReconciler {
        &self.feed
    }
    pub fn feed_ids(&self) -> Vec<i64> {
        self.feed.visible().iter().map(|post| post.id).collect()
    }
    pub fn feed_index(&self) -> Option<usize> {
        self.feed_cursor.index_in(&self.feed_ids())
    }
    pub fn selected_post(&self) -> Option<&Post> {
        self.feed.get(self.feed_cursor.selected()?)
    }
    pub fn screen(&self) -> Screen {
        self.screen
    }
    pub fn detail(&self) -> Option<&Detail> {
        self.detail.as_ref()
    }
    pub fn moderation(&self) -> &Moderation {
        &self.moderation
    }
    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }
    pub fn alerts(&self) -> &Alerts {
        &self.alerts
    }
    pub fn connection(&self) -> Connection {
        self.connection
    }
    pub fn is_loading(&self) -> bool {
        self.loading || self.search.is_running()
    }
    pub fn is_admin(&self) -> bool {
        self.admin
    }
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Popular tags: the server's tag list ranked by usage in the loaded
    /// posts, or local usage alone before the tag list arrived.
    pub fn tag_panel(&self, limit: usize) -> Vec<(String, usize)> {
        let local = self.feed.popular_tags(usize::MAX);
        if self.tags.is_empty() {
            return local.into_iter().take(limit).collect();
        }
        let mut tags: Vec<(String, usize)> = self
            .tags
            .iter()
            .map(|tag| {
                let used = local
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(&tag.name))
                    .map(|(_, count)| *count)
                    .or(tag.count.map(|count| count as usize))
                    .unwrap_or_default();
                (tag.name.clone(), used)
            })
            .collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tags.truncate(limit);
        tags
    }

    /// Admins may touch anything. Without a configured user id ownership is
    /// left to the server.
    pub fn can_modify(&self, owner: UserId) -> bool {
        self.admin || self.user_id.map_or(true, |me| me == owner)
    }

    //==========================================================================
    // Message loop
    //==========================================================================
    pub fn update(&mut self, message: AppMessage) -> Vec<Effect> {
        match message {
            AppMessage::Key(key) => match input::action(self, key) {
                Some(action) => self.perform(action),
                None => vec![],
            },
            AppMessage::Push(push) => self.on_push(push),
            AppMessage::Posts { ticket, result } => {
                if !self.search.finish(ticket) {
                    return vec![];
                }
                self.loading = false;
                match result {
                    Ok(posts) => self.seed(posts),
                    Err(err) => self.fail("Could not load posts", &err),
                }
                vec![]
            }
            AppMessage::Tags { ticket, result } => {
                if self.tag_request.finish(ticket) {
                    match result {
                        Ok(tags) => self.tags = tags,
                        Err(err) => self.fail("Could not load tags", &err),
                    }
                }
                vec![]
            }
            AppMessage::Detail { post_id, result } => self.on_detail(post_id, result),
            AppMessage::Replies {
                post_id,
                parent,
                result,
            } => {
                let Some(thread) = self.thread_mut(post_id) else {
                    return vec![];
                };
                match result {
                    Ok(replies) => {
                        thread.attach_replies(parent, replies);
                    }
                    Err(err) => {
                        thread.replies_failed(parent);
                        self.fail("Could not load replies", &err);
                    }
                }
                vec![]
            }
            AppMessage::PostLiked { post_id, result } => {
                match result {
                    Ok(server) => {
                        let state = server.unwrap_or_else(|| self.feed.like(post_id));
                        self.feed.commit_like(post_id, state);
                    }
                    Err(err) => {
                        self.feed.rollback_like(post_id);
                        self.fail("Like failed", &err);
                    }
                }
                vec![]
            }
            AppMessage::CommentLiked {
                post_id,
                comment_id,
                result,
            } => {
                let failure = match (self.thread_mut(post_id), result) {
                    (None, _) => None,
                    (Some(thread), Ok(server)) => {
                        let state = server.unwrap_or_else(|| thread.like(comment_id));
                        thread.commit_like(comment_id, state);
                        None
                    }
                    (Some(thread), Err(err)) => {
                        thread.rollback_like(comment_id);
                        Some(err)
                    }
                };
                if let Some(err) = failure {
                    self.fail("Like failed", &err);
                }
                vec![]
            }
            AppMessage::PostDeleted { post_id, result } => {
                self.deleting.remove(&post_id);
                match result {
                    Ok(()) => self.post_gone(post_id),
                    Err(err) if err.is_not_found() => self.post_gone(post_id),
                    Err(err) => {
                        self.feed.rollback_delete(post_id);
                        self.moderation.rollback_delete(post_id);
                        self.fail("Delete failed", &err);
                    }
                }
                vec![]
            }
            AppMessage::PostSaved { editing, result } => self.on_post_saved(editing, result),
            AppMessage::CommentCreated { post_id, result } => {
                let result = result.map(|comment| {
                    self.feed.adjust_comment_count(post_id, 1);
                    match (comment, self.thread_mut(post_id)) {
                        (Some(comment), Some(thread)) => {
                            thread.add(comment);
                            vec![]
                        }
                        // no entity in the response: read the thread again
                        (None, Some(_)) => vec![Effect::LoadDetail(post_id)],
                        (_, None) => vec![],
                    }
                });
                self.composer_done(
                    |kind| matches!(kind, ComposerKind::Comment { post_id: id, .. } if *id == post_id),
                    result,
                    "Comment posted",
                )
            }
            AppMessage::CommentEdited {
                post_id,
                comment_id,
                text,
                result,
            } => {
                let result = result.map(|()| {
                    if let Some(thread) = self.thread_mut(post_id) {
                        thread.edit(comment_id, &text);
                    }
                    vec![]
                });
                self.composer_done(
                    |kind| matches!(kind, ComposerKind::EditComment { comment_id: id, .. } if *id == comment_id),
                    result,
                    "Comment updated",
                )
            }
            AppMessage::CommentDeleted {
                post_id,
                comment_id,
                result,
            } => {
                let failure = match (self.thread_mut(post_id), result) {
                    (None, _) => None,
                    (Some(thread), Ok(())) => {
                        let removed = thread.commit_delete(comment_id);
                        self.feed.adjust_comment_count(post_id, -(removed as i64));
                        None
                    }
                    (Some(thread), Err(err)) if err.is_not_found() => {
                        let removed = thread.commit_delete(comment_id);
                        self.feed.adjust_comment_count(post_id, -(removed as i64));
                        None
                    }
                    (Some(thread), Err(err)) => {
                        thread.rollback_delete(comment_id);
                        Some(err)
                    }
                };
                if let Some(err) = failure {
                    self.fail("Delete failed", &err);
                }
                vec![]
            }
            AppMessage::Reported { post_id, result } => self.composer_done(
                |kind| *kind == ComposerKind::Report(post_id),
                result.map(|()| vec![]),
                "Report sent",
            ),
            AppMessage::Reports(result) => {
                match result {
                    Ok(reports) => self.moderation.load(reports),
                    Err(err) => {
                        self.moderation.loading = false;
                        self.fail("Could not load reports", &err);
                    }
                }
                vec![]
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.alerts.expire(now);
    }

    /// Lets a newer request of the same kind abort the task serving `ticket`.
    pub fn track(&mut self, kind: Superseding, ticket: Ticket, handle: AbortHandle) {
        match kind {
            Superseding::Search => self.search.attach(ticket, handle),
            Superseding::Tags => self.tag_request.attach(ticket, handle),
        }
    }

    //==========================================================================
    // Push
    //==========================================================================
    fn on_push(&mut self, push: PushMessage) -> Vec<Effect> {
        match push {
            PushMessage::Connected => {
                let resync = matches!(self.connection, Connection::Offline { .. });
                self.connection = Connection::Online;
                if resync {
                    info!("Push channel back, reloading the feed");
                    return self.refresh();
                }
                vec![]
            }
            PushMessage::Disconnected { reason, retry_in } => {
                debug!("Push channel down: {}", reason);
                self.connection = Connection::Offline { retry_in };
                vec![]
            }
            PushMessage::Event(event) => {
                self.on_event(event);
                vec![]
            }
        }
    }

    fn on_event(&mut self, event: FeedEvent) {
        match &event {
            FeedEvent::Deleted(id) if self.detail_post() == Some(*id) => {
                self.close_detail();
                self.alerts.info("The post you were reading was deleted");
            }
            FeedEvent::Updated(post) => {
                if let Some(detail) = self.detail.as_mut().filter(|d| d.post_id == post.id) {
                    detail.post = Some(post.clone());
                }
            }
            _ => {}
        }

        match event {
            FeedEvent::Created(post) => {
                if self.feed.apply_created(post) == Created::Inserted {
                    self.feed_cursor.top(&self.feed_ids());
                }
            }
            event => self.feed.apply_event(event),
        }
    }

    //==========================================================================
    // Helpers shared by input and results
    //==========================================================================
    fn refresh(&mut self) -> Vec<Effect> {
        self.loading = true;
        let posts = if self.feed.filter().is_empty() {
            Effect::LoadPosts {
                ticket: self.search.issue(),
            }
        } else {
            Effect::Search {
                ticket: self.search.issue(),
                filter: self.feed.filter().clone(),
            }
        };
        let tags = Effect::LoadTags {
            ticket: self.tag_request.issue(),
        };
        vec![posts, tags]
    }

    fn seed(&mut self, posts: Vec<Post>) {
        self.loading = false;
        self.feed.seed(posts);
        let ids = self.feed_ids();
        self.feed_cursor.resolve(&ids);
    }

    fn fail(&mut self, what: &str, err: &FeedError) {
        warn!("{}: {}", what, err);
        self.alerts.error(format!("{}: {}", what, err));
    }

    /// Records whether the selection sits on the first row. Going back to
    /// the top shows buffered posts.
    fn sync_viewport(&mut self) {
        let ids = self.feed_ids();
        let at_top = self.feed_cursor.resolve(&ids).map_or(true, |index| index == 0);
        if self.feed.set_at_top(at_top) > 0 {
            self.feed_cursor.top(&self.feed_ids());
        }
    }

    fn detail_post(&self) -> Option<PostId> {
        self.detail.as_ref().map(|detail| detail.post_id)
    }

    fn thread_mut(&mut self, post_id: PostId) -> Option<&mut CommentThread> {
        self.detail
            .as_mut()
            .filter(|detail| detail.post_id == post_id)?
            .thread
            .as_mut()
    }

    fn open_detail(&mut self, post_id: PostId) -> Vec<Effect> {
        let post = self.feed.get(post_id).cloned();
        self.detail = Some(Detail::loading(post_id, post));
        if self.screen != Screen::Detail {
            self.back_to = self.screen;
        }
        self.screen = Screen::Detail;
        vec![Effect::LoadDetail(post_id)]
    }

    fn close_detail(&mut self) {
        self.detail = None;
        if self.screen == Screen::Detail {
            self.screen = self.back_to;
        }
    }

    fn on_detail(&mut self, post_id: PostId, result: Result<PostDetail>) -> Vec<Effect> {
        if self.detail_post() != Some(post_id) {
            return vec![];
        }
        match result {
            Ok(PostDetail { post, comments }) => {
                self.feed.apply_updated(post.clone());
                if let Some(detail) = self.detail.as_mut() {
                    detail.thread = Some(CommentThread::new(post_id, comments));
                    detail.post = Some(post);
                    detail.error = None;
                }
            }
            Err(err) if err.is_not_found() => {
                self.feed.apply_deleted(post_id);
                self.close_detail();
                self.fail("Post is gone", &err);
            }
            Err(err) => {
                if let Some(detail) = self.detail.as_mut() {
                    detail.error = Some(err.to_string());
                }
                self.fail("Could not load post", &err);
            }
        }
        vec![]
    }

    /// Hides the post wherever it is shown and sends one DELETE, unless one
    /// is already in flight.
    fn delete_post(&mut self, post_id: PostId) -> Vec<Effect> {
        if !self.deleting.insert(post_id) {
            debug!("Delete of post {} still pending", post_id);
            return vec![];
        }
        self.feed.begin_delete(post_id);
        self.moderation.begin_delete(post_id);
        vec![Effect::DeletePost(post_id)]
    }

    fn post_gone(&mut self, post_id: PostId) {
        self.feed.commit_delete(post_id);
        self.feed.apply_deleted(post_id);
        self.moderation.commit_delete(post_id);
        if self.detail_post() == Some(post_id) {
            self.close_detail();
        }
    }

    fn on_post_saved(&mut self, editing: Option<PostId>, result: Result<Option<Post>>) -> Vec<Effect> {
        let result = result.map(|post| match (editing, post) {
            (_, Some(post)) => {
                let id = post.id;
                if editing.is_some() {
                    self.feed.apply_updated(post.clone());
                } else {
                    self.feed.apply_created(post.clone());
                }
                if let Some(detail) = self.detail.as_mut().filter(|d| d.post_id == id) {
                    detail.post = Some(post);
                }
                vec![]
            }
            // no entity in the response: the push channel or a reload brings it
            (Some(id), None) if self.detail_post() == Some(id) => vec![Effect::LoadDetail(id)],
            (_, None) => vec![],
        });

        let message = if editing.is_some() {
            "Post updated"
        } else {
            "Post published"
        };
        self.composer_done(
            |kind| match editing {
                Some(id) => *kind == ComposerKind::EditPost(id),
                None => *kind == ComposerKind::NewPost,
            },
            result,
            message,
        )
    }

    /// Settles a composer submission. Success closes the modal; failure
    /// stays inline when the modal is still open, otherwise it alerts.
    fn composer_done(
        &mut self,
        is_mine: impl Fn(&ComposerKind) -> bool,
        result: Result<Vec<Effect>>,
        success: &str,
    ) -> Vec<Effect> {
        let open = matches!(&self.overlay, Some(Overlay::Composer(c)) if is_mine(&c.kind));
        match result {
            Ok(effects) => {
                if open {
                    self.overlay = None;
                }
                self.alerts.info(success);
                effects
            }
            Err(err) => {
                match self.overlay.as_mut() {
                    Some(Overlay::Composer(composer)) if open => {
                        warn!("{}", err);
                        composer.submitting = false;
                        composer.error = Some(err.to_string());
                    }
                    _ => self.fail("Request failed", &err),
                }
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests;
