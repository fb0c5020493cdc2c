pub mod decode;

use chrono::{DateTime, Utc};
use mime_guess::MimeGuess;
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use decode::RawFlag;

pub type PostId = i64;
pub type CommentId = i64;
pub type UserId = i64;
pub type TagId = i64;

//==============================================================================
// Post
//==============================================================================
#[serde_as]
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: PostId,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Rich text, usually HTML.
    #[serde(default, alias = "body")]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(deserialize_with = "decode::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "liked", deserialize_with = "decode::flag")]
    pub is_liked: bool,
}

impl Post {
    pub fn author(&self) -> String {
        self.user_name
            .clone()
            .unwrap_or_else(|| format!("user #{}", self.user_id))
    }

    /// Body converted to markdown-ish text for the terminal.
    pub fn plain_content(&self) -> String {
        htmd::convert(&self.content).unwrap_or_else(|_| self.content.clone())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

//==============================================================================
// Comment
//==============================================================================
#[serde_as]
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: CommentId,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub post_id: PostId,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, alias = "parentId")]
    pub parent_comment_id: Option<CommentId>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, alias = "content")]
    pub text: String,
    #[serde(deserialize_with = "decode::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default, alias = "liked", deserialize_with = "decode::flag")]
    pub is_liked: bool,
}

impl Comment {
    pub fn author(&self) -> String {
        self.user_name
            .clone()
            .unwrap_or_else(|| format!("user #{}", self.user_id))
    }
}

//==============================================================================
// Moderation
//==============================================================================
#[serde_as]
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub post_id: PostId,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "decode::optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

//==============================================================================
// Tags & likes
//==============================================================================
#[serde_as]
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub count: Option<u32>,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikedUser {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(alias = "id")]
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Response of the like-status endpoints: a bare flag or an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeStatus(pub bool);

impl<'de> Deserialize<'de> for LikeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(RawFlag),
            Object {
                #[serde(alias = "liked", alias = "isLiked")]
                is_liked: RawFlag,
            },
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Flag(raw) | Raw::Object { is_liked: raw } => raw,
        };
        raw.into_bool()
            .map(LikeStatus)
            .map_err(serde::de::Error::custom)
    }
}

//==============================================================================
// Request bodies
//==============================================================================
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_id: PostId,
    pub parent_comment_id: Option<CommentId>,
    pub text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub reason: String,
    pub email: String,
}

//==============================================================================
// Media
//==============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a media URL by its file extension.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let filename = path.rsplit('/').next().unwrap_or(path);
        let mime = MimeGuess::from_path(filename).first()?;
        match mime.type_().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn post(id: PostId, created_at: &str) -> Post {
    Post {
        id,
        user_id: 1,
        user_name: Some("alice".to_string()),
        title: format!("post {}", id),
        content: String::new(),
        image_url: None,
        video_url: None,
        tags: vec![],
        like_count: 0,
        comment_count: 0,
        created_at: decode::parse_timestamp(created_at).unwrap(),
        is_liked: false,
    }
}

#[cfg(test)]
pub(crate) fn comment(id: CommentId, parent: Option<CommentId>, text: &str) -> Comment {
    Comment {
        id,
        post_id: 1,
        parent_comment_id: parent,
        user_id: 1,
        user_name: None,
        text: text.to_string(),
        created_at: decode::parse_timestamp("2024-01-01").unwrap(),
        like_count: 0,
        is_liked: false,
    }
}
