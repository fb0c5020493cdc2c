use std::{env, fs, process::Command};

use log::debug;

use crate::{
    app::{composer::Composer, Effect},
    error::{FeedError, Result},
    model::NewPost,
};

const TEMPLATE: &str = "\n\n# First line is the title, the rest is the post.\n\
# Optional: `media: <url>` and `tags: a, b`. Lines starting with # are dropped.\n";

/// Opens `$EDITOR` on a scratch file and returns what was saved.
pub fn edit_in_editor() -> Result<String> {
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let mut path = env::temp_dir();
    path.push(format!("feed-client-{}.md", std::process::id()));
    fs::write(&path, TEMPLATE)?;

    debug!("Opening {} with {}", path.display(), editor);
    let status = Command::new(&editor).arg(&path).status()?;
    let content = fs::read_to_string(&path);
    let _ = fs::remove_file(&path);

    if !status.success() {
        return Err(FeedError::Io(format!("{} exited with {}", editor, status)));
    }
    Ok(content?)
}

/// Turns an editor buffer into a validated post body, through the same
/// checks the in-app composer runs.
pub fn parse_draft(text: &str) -> Result<NewPost> {
    let mut title = None;
    let mut content = vec![];
    let mut media = String::new();
    let mut tags = String::new();

    for line in text.lines().filter(|line| !line.starts_with('#')) {
        if let Some(value) = line.strip_prefix("media:") {
            media = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("tags:") {
            tags = value.trim().to_string();
        } else if title.is_none() {
            if !line.trim().is_empty() {
                title = Some(line.trim().to_string());
            }
        } else {
            content.push(line);
        }
    }

    let mut composer = Composer::new_post();
    let values = [
        title.unwrap_or_default(),
        content.join("\n").trim().to_string(),
        media,
        tags,
    ];
    for (field, value) in composer.fields.iter_mut().zip(values) {
        field.value = value;
    }

    match composer.submit()? {
        Effect::SavePost { post, .. } => Ok(post),
        effect => Err(FeedError::Validation(format!("unexpected draft {:?}", effect))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_content_and_extras() {
        let post = parse_draft(
            "\nHello there\nfirst line\n\nsecond line\nmedia: https://cdn.test/a.png\ntags: rust, tui\n# note\n",
        )
        .unwrap();
        assert_eq!(post.title, "Hello there");
        assert_eq!(post.content, "first line\n\nsecond line");
        assert_eq!(post.image_url.as_deref(), Some("https://cdn.test/a.png"));
        assert_eq!(post.tags, vec!["rust", "tui"]);
    }

    #[test]
    fn empty_draft_is_rejected() {
        let err = parse_draft(TEMPLATE).unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
    }
}
