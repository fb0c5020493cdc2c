use log::debug;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};

use crate::{
    api::ApiClient,
    error::Result,
    feed::FeedFilter,
    latest::Ticket,
    model::{CommentId, NewComment, NewPost, NewReport, PostId},
    optimistic::LikeState,
};

use super::AppMessage;

/// Kinds of request where only the newest one matters. A full reload and
/// a search both replace the feed, so they share one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Superseding {
    Search,
    Tags,
}

/// A REST call requested by the store. It runs on its own task and reports
/// back with an [`AppMessage`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadPosts { ticket: Ticket },
    Search { ticket: Ticket, filter: FeedFilter },
    LoadTags { ticket: Ticket },
    LoadDetail(PostId),
    LoadReplies { post_id: PostId, parent: CommentId },
    LikePost { post_id: PostId, like: bool },
    LikeComment { post_id: PostId, comment_id: CommentId, like: bool },
    DeletePost(PostId),
    SavePost { editing: Option<PostId>, post: NewPost },
    CreateComment(NewComment),
    EditComment { post_id: PostId, comment_id: CommentId, text: String },
    DeleteComment { post_id: PostId, comment_id: CommentId },
    Report { post_id: PostId, report: NewReport },
    LoadReports,
}

impl Effect {
    pub fn superseding(&self) -> Option<(Superseding, Ticket)> {
        match self {
            Effect::LoadPosts { ticket } | Effect::Search { ticket, .. } => {
                Some((Superseding::Search, *ticket))
            }
            Effect::LoadTags { ticket } => Some((Superseding::Tags, *ticket)),
            _ => None,
        }
    }

    pub fn spawn(self, api: ApiClient, tx: UnboundedSender<AppMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let message = self.run(&api).await;
            if tx.send(message).is_err() {
                debug!("Store is gone, dropping response");
            }
        })
    }

    pub async fn run(self, api: &ApiClient) -> AppMessage {
        match self {
            Effect::LoadPosts { ticket } => AppMessage::Posts {
                ticket,
                result: api.get_posts().await,
            },
            Effect::Search { ticket, filter } => AppMessage::Posts {
                ticket,
                result: api.search_posts(&filter).await,
            },
            Effect::LoadTags { ticket } => AppMessage::Tags {
                ticket,
                result: api.get_tags().await,
            },
            Effect::LoadDetail(post_id) => AppMessage::Detail {
                post_id,
                result: api.get_post(post_id).await,
            },
            Effect::LoadReplies { post_id, parent } => AppMessage::Replies {
                post_id,
                parent,
                result: api.get_replies(parent).await,
            },
            Effect::LikePost { post_id, like } => AppMessage::PostLiked {
                post_id,
                result: like_post(api, post_id, like).await,
            },
            Effect::LikeComment {
                post_id,
                comment_id,
                like,
            } => AppMessage::CommentLiked {
                post_id,
                comment_id,
                result: like_comment(api, comment_id, like).await,
            },
            Effect::DeletePost(post_id) => AppMessage::PostDeleted {
                post_id,
                result: api.delete_post(post_id).await,
            },
            Effect::SavePost { editing, post } => {
                let result = match editing {
                    Some(id) => api.update_post(id, &post).await,
                    None => api.create_post(&post).await,
                };
                AppMessage::PostSaved { editing, result }
            }
            Effect::CreateComment(comment) => AppMessage::CommentCreated {
                post_id: comment.post_id,
                result: api.create_comment(&comment).await,
            },
            Effect::EditComment {
                post_id,
                comment_id,
                text,
            } => {
                let result = api.update_comment(comment_id, &text).await;
                AppMessage::CommentEdited {
                    post_id,
                    comment_id,
                    text,
                    result,
                }
            }
            Effect::DeleteComment {
                post_id,
                comment_id,
            } => AppMessage::CommentDeleted {
                post_id,
                comment_id,
                result: api.delete_comment(comment_id).await,
            },
            Effect::Report { post_id, report } => AppMessage::Reported {
                post_id,
                result: api.report_post(post_id, &report).await,
            },
            Effect::LoadReports => AppMessage::Reports(api.get_reports().await),
        }
    }
}

/// Outcome of a like toggle. The mutation itself decides success; the
/// follow-up read is best effort and `None` when it failed.
pub type LikeOutcome = Result<Option<LikeState>>;

async fn like_post(api: &ApiClient, id: PostId, like: bool) -> LikeOutcome {
    if like {
        api.like_post(id).await?;
    } else {
        api.unlike_post(id).await?;
    }
    let read = tokio::try_join!(api.post_like_status(id), api.post_liked_users(id));
    Ok(read
        .map(|(liked, users)| LikeState::new(users.len() as u32, liked))
        .map_err(|err| debug!("Like read-back for post {} failed: {}", id, err))
        .ok())
}

async fn like_comment(api: &ApiClient, id: CommentId, like: bool) -> LikeOutcome {
    if like {
        api.like_comment(id).await?;
    } else {
        api.unlike_comment(id).await?;
    }
    let read = tokio::try_join!(api.comment_like_status(id), api.comment_liked_users(id));
    Ok(read
        .map(|(liked, users)| LikeState::new(users.len() as u32, liked))
        .map_err(|err| debug!("Like read-back for comment {} failed: {}", id, err))
        .ok())
}
