use crate::{error::Result, model::Tag};

use super::ApiClient;

impl ApiClient {
    pub async fn get_tags(&self) -> Result<Vec<Tag>> {
        self.fetch("/api/tags", vec![]).await
    }
}
