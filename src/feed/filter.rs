use std::fmt;

use chrono::NaiveDate;

use crate::{
    api::Query,
    error::{FeedError, Result},
    model::{Post, UserId},
};

/// Text / date / author filter. Applied locally as a preview, or sent to
/// the search endpoint to re-query the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    pub text: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub user_id: Option<UserId>,
}

impl FeedFilter {
    /// Parse `free text from:2024-01-01 to:2024-02-01 user:4`.
    pub fn parse(input: &str) -> Result<Self> {
        let mut filter = FeedFilter::default();
        let mut words = vec![];

        for word in input.split_whitespace() {
            match word.split_once(':') {
                Some(("from", value)) => filter.from = Some(parse_date(value)?),
                Some(("to", value)) => filter.to = Some(parse_date(value)?),
                Some(("user", value)) => {
                    let id = value
                        .parse()
                        .map_err(|_| FeedError::Validation(format!("invalid user id `{}`", value)))?;
                    filter.user_id = Some(id);
                }
                _ => words.push(word),
            }
        }

        if !words.is_empty() {
            filter.text = Some(words.join(" "));
        }
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(FeedError::Validation(format!(
                    "`from` ({}) is after `to` ({})",
                    from, to
                )));
            }
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        *self == FeedFilter::default()
    }

    pub fn matches(&self, post: &Post) -> bool {
        let mut accept = true;

        let date = post.created_at.date_naive();
        accept &= self.from.map_or(true, |from| date >= from);
        accept &= self.to.map_or(true, |to| date <= to);
        accept &= self.user_id.map_or(true, |id| post.user_id == id);

        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            accept &= post.title.to_lowercase().contains(&needle)
                || post.content.to_lowercase().contains(&needle)
                || post.author().to_lowercase().contains(&needle)
                || post
                    .tags
                    .iter()
                    .any(|tag| tag.name.to_lowercase().contains(&needle));
        }

        accept
    }

    pub fn query(&self) -> Query {
        let mut query = vec![];
        if let Some(text) = &self.text {
            query.push(("text", text.clone()));
        }
        if let Some(from) = self.from {
            query.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            query.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(user_id) = self.user_id {
            query.push(("userId", user_id.to_string()));
        }
        query
    }
}

impl fmt::Display for FeedFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts = vec![];
        if let Some(text) = &self.text {
            parts.push(text.clone());
        }
        if let Some(from) = self.from {
            parts.push(format!("from:{}", from));
        }
        if let Some(to) = self.to {
            parts.push(format!("to:{}", to));
        }
        if let Some(user_id) = self.user_id {
            parts.push(format!("user:{}", user_id));
        }
        write!(f, "{}", parts.join(" "))
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| FeedError::Validation(format!("invalid date `{}`, expected YYYY-MM-DD", value)))
}
