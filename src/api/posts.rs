use reqwest::Method;
use serde_json::json;

use crate::{
    error::Result,
    feed::FeedFilter,
    model::{LikeStatus, LikedUser, NewPost, NewReport, Post, PostDetail, PostId, Report},
};

use super::ApiClient;

impl ApiClient {
    pub async fn get_posts(&self) -> Result<Vec<Post>> {
        self.fetch("/api/posts", vec![]).await
    }

    pub async fn get_post(&self, id: PostId) -> Result<PostDetail> {
        self.fetch(&format!("/api/posts/{}", id), vec![]).await
    }

    pub async fn search_posts(&self, filter: &FeedFilter) -> Result<Vec<Post>> {
        self.fetch("/api/posts/search", filter.query()).await
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Option<Post>> {
        self.mutate(Method::POST, "/api/posts", vec![], Some(json!(post)))
            .await
    }

    pub async fn update_post(&self, id: PostId, post: &NewPost) -> Result<Option<Post>> {
        self.mutate(
            Method::PUT,
            &format!("/api/posts/{}", id),
            vec![],
            Some(json!(post)),
        )
        .await
    }

    pub async fn delete_post(&self, id: PostId) -> Result<()> {
        self.execute(Method::DELETE, &format!("/api/posts/{}", id), vec![], None)
            .await
    }

    //==========================================================================
    // Likes
    //==========================================================================
    pub async fn like_post(&self, id: PostId) -> Result<()> {
        self.execute(Method::POST, "/api/post-likes", post_query(id), None)
            .await
    }

    pub async fn unlike_post(&self, id: PostId) -> Result<()> {
        self.execute(Method::DELETE, "/api/post-likes", post_query(id), None)
            .await
    }

    pub async fn post_like_status(&self, id: PostId) -> Result<bool> {
        let status: LikeStatus = self
            .fetch("/api/post-likes/status", post_query(id))
            .await?;
        Ok(status.0)
    }

    pub async fn post_liked_users(&self, id: PostId) -> Result<Vec<LikedUser>> {
        self.fetch(&format!("/api/post-likes/posts/{}", id), vec![])
            .await
    }

    //==========================================================================
    // Reports
    //==========================================================================
    pub async fn report_post(&self, id: PostId, report: &NewReport) -> Result<()> {
        self.execute(
            Method::POST,
            &format!("/api/post-likes/postsReports/{}", id),
            vec![],
            Some(json!(report)),
        )
        .await
    }

    pub async fn get_reports(&self) -> Result<Vec<Report>> {
        self.fetch("/api/post-likes/postsReports", vec![]).await
    }
}

fn post_query(id: PostId) -> super::Query {
    vec![("postId", id.to_string())]
}
