use url::Url;

use crate::{
    error::{FeedError, Result},
    model::{Comment, CommentId, MediaKind, NewComment, NewPost, NewReport, Post, PostId},
};

use super::effects::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerKind {
    NewPost,
    EditPost(PostId),
    Comment {
        post_id: PostId,
        parent: Option<CommentId>,
    },
    EditComment {
        post_id: PostId,
        comment_id: CommentId,
    },
    Report(PostId),
}

impl ComposerKind {
    pub fn title(&self) -> String {
        match self {
            ComposerKind::NewPost => "New post".to_string(),
            ComposerKind::EditPost(id) => format!("Edit post #{}", id),
            ComposerKind::Comment { parent: None, .. } => "Comment".to_string(),
            ComposerKind::Comment {
                parent: Some(id), ..
            } => format!("Reply to #{}", id),
            ComposerKind::EditComment { comment_id, .. } => format!("Edit comment #{}", comment_id),
            ComposerKind::Report(id) => format!("Report post #{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    pub required: bool,
    pub multiline: bool,
}

impl Field {
    fn line(label: &'static str, required: bool) -> Self {
        Self {
            label,
            value: String::new(),
            required,
            multiline: false,
        }
    }

    fn text(label: &'static str) -> Self {
        Self {
            multiline: true,
            ..Self::line(label, true)
        }
    }

    fn with(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

/// Modal form. Validation happens on submit, before any request is made,
/// and the error stays inline until the next edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    pub kind: ComposerKind,
    pub fields: Vec<Field>,
    pub focus: usize,
    pub error: Option<String>,
    /// Sent, waiting for the server.
    pub submitting: bool,
}

impl Composer {
    fn with_fields(kind: ComposerKind, fields: Vec<Field>) -> Self {
        Self {
            kind,
            fields,
            focus: 0,
            error: None,
            submitting: false,
        }
    }

    pub fn new_post() -> Self {
        Self::with_fields(ComposerKind::NewPost, post_fields().into())
    }

    /// The body is edited as stored so an untouched body goes back unchanged.
    pub fn edit_post(post: &Post) -> Self {
        let media = post
            .video_url
            .clone()
            .or_else(|| post.image_url.clone())
            .unwrap_or_default();
        let tags = post
            .tags
            .iter()
            .map(|tag| tag.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let [title, content, media_field, tags_field] = post_fields();
        Self::with_fields(
            ComposerKind::EditPost(post.id),
            vec![
                title.with(&post.title),
                content.with(&post.content),
                media_field.with(media),
                tags_field.with(tags),
            ],
        )
    }

    pub fn comment(post_id: PostId, parent: Option<CommentId>) -> Self {
        Self::with_fields(
            ComposerKind::Comment { post_id, parent },
            vec![Field::text("Text")],
        )
    }

    pub fn edit_comment(comment: &Comment) -> Self {
        Self::with_fields(
            ComposerKind::EditComment {
                post_id: comment.post_id,
                comment_id: comment.id,
            },
            vec![Field::text("Text").with(&comment.text)],
        )
    }

    pub fn report(post_id: PostId) -> Self {
        Self::with_fields(
            ComposerKind::Report(post_id),
            vec![Field::text("Reason"), Field::line("Email", true)],
        )
    }

    //==========================================================================
    // Editing
    //==========================================================================
    pub fn focused(&self) -> Option<&Field> {
        self.fields.get(self.focus)
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len().max(1);
    }

    pub fn previous_field(&mut self) {
        let len = self.fields.len().max(1);
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn input(&mut self, c: char) {
        self.error = None;
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.push(c);
        }
    }

    /// Enter: new line in a text area, next field otherwise.
    pub fn enter(&mut self) {
        match self.focused() {
            Some(field) if field.multiline => self.input('\n'),
            _ => self.next_field(),
        }
    }

    pub fn backspace(&mut self) {
        self.error = None;
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map_or("", |field| field.value.trim())
    }

    /// Image or video, from the media URL extension.
    pub fn media(&self) -> Option<MediaKind> {
        MediaKind::from_url(self.value("Media URL"))
    }

    //==========================================================================
    // Submit
    //==========================================================================
    /// Validates the form and produces the request. On failure the message
    /// is kept on the composer as well.
    pub fn submit(&mut self) -> Result<Effect> {
        let result = self.validate();
        self.error = result.as_ref().err().map(ToString::to_string);
        self.submitting = result.is_ok();
        result
    }

    fn validate(&self) -> Result<Effect> {
        if let Some(field) = self
            .fields
            .iter()
            .find(|field| field.required && field.value.trim().is_empty())
        {
            return Err(FeedError::Validation(format!("{} is required", field.label)));
        }

        let effect = match self.kind {
            ComposerKind::NewPost => Effect::SavePost {
                editing: None,
                post: self.new_post_body()?,
            },
            ComposerKind::EditPost(id) => Effect::SavePost {
                editing: Some(id),
                post: self.new_post_body()?,
            },
            ComposerKind::Comment { post_id, parent } => Effect::CreateComment(NewComment {
                post_id,
                parent_comment_id: parent,
                text: self.value("Text").to_string(),
            }),
            ComposerKind::EditComment {
                post_id,
                comment_id,
            } => Effect::EditComment {
                post_id,
                comment_id,
                text: self.value("Text").to_string(),
            },
            ComposerKind::Report(post_id) => {
                let email = self.value("Email");
                validate_email(email)?;
                Effect::Report {
                    post_id,
                    report: NewReport {
                        reason: self.value("Reason").to_string(),
                        email: email.to_string(),
                    },
                }
            }
        };
        Ok(effect)
    }

    fn new_post_body(&self) -> Result<NewPost> {
        let mut post = NewPost {
            title: self.value("Title").to_string(),
            content: self.value("Content").to_string(),
            tags: parse_tags(self.value("Tags")),
            ..NewPost::default()
        };

        let media = self.value("Media URL");
        if !media.is_empty() {
            let url = Url::parse(media)
                .map_err(|e| FeedError::Validation(format!("Media URL: {}", e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(FeedError::Validation("Media URL must be http(s)".to_string()));
            }
            match self.media() {
                Some(MediaKind::Image) => post.image_url = Some(media.to_string()),
                Some(MediaKind::Video) => post.video_url = Some(media.to_string()),
                None => {
                    return Err(FeedError::Validation(
                        "Media URL must point to an image or a video".to_string(),
                    ))
                }
            }
        }
        Ok(post)
    }
}

fn post_fields() -> [Field; 4] {
    [
        Field::line("Title", true),
        Field::text("Content"),
        Field::line("Media URL", false),
        Field::line("Tags", false),
    ]
}

/// `#rust, async tokio` → `["rust", "async", "tokio"]`, without duplicates.
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = vec![];
    for tag in input.split(|c: char| c == ',' || c.is_whitespace()) {
        let tag = tag.trim().trim_start_matches('#');
        if !tag.is_empty() && !tags.iter().any(|known| known.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FeedError::Validation(format!("`{}` is not an email address", email)))
    }
}
