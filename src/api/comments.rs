use reqwest::Method;
use serde_json::json;

use crate::{
    error::Result,
    model::{Comment, CommentId, LikeStatus, LikedUser, NewComment},
};

use super::{ApiClient, Query};

impl ApiClient {
    pub async fn create_comment(&self, comment: &NewComment) -> Result<Option<Comment>> {
        self.mutate(Method::POST, "/api/comments", vec![], Some(json!(comment)))
            .await
    }

    pub async fn get_replies(&self, id: CommentId) -> Result<Vec<Comment>> {
        self.fetch(&format!("/api/comments/{}/replies", id), vec![])
            .await
    }

    pub async fn update_comment(&self, id: CommentId, text: &str) -> Result<()> {
        self.execute(
            Method::PUT,
            &format!("/api/comments/{}", id),
            vec![("Text", text.to_string())],
            None,
        )
        .await
    }

    pub async fn delete_comment(&self, id: CommentId) -> Result<()> {
        self.execute(Method::DELETE, &format!("/api/comments/{}", id), vec![], None)
            .await
    }

    pub async fn like_comment(&self, id: CommentId) -> Result<()> {
        self.execute(Method::POST, "/api/comment-likes", comment_query(id), None)
            .await
    }

    pub async fn unlike_comment(&self, id: CommentId) -> Result<()> {
        self.execute(Method::DELETE, "/api/comment-likes", comment_query(id), None)
            .await
    }

    pub async fn comment_like_status(&self, id: CommentId) -> Result<bool> {
        let status: LikeStatus = self
            .fetch("/api/comment-likes/status", comment_query(id))
            .await?;
        Ok(status.0)
    }

    pub async fn comment_liked_users(&self, id: CommentId) -> Result<Vec<LikedUser>> {
        self.fetch("/api/comment-likes/users", comment_query(id))
            .await
    }
}

fn comment_query(id: CommentId) -> Query {
    vec![("commentId", id.to_string())]
}
