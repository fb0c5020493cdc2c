pub mod comments;
pub mod posts;
pub mod tags;

use log::{debug, log_enabled, trace};
use reqwest::{header, Client, Method};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use url::Url;

use crate::{
    config::Config,
    error::{FeedError, Result},
};

const RETRY_LIMIT: u32 = 3;

pub type Query = Vec<(&'static str, String)>;

/// REST client for the feed backend. Cheap to clone; clones share the
/// connection pool and the concurrency limit.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    semaphore: Arc<Semaphore>,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base(config.api_url().clone(), config.token(), config.limit())
    }

    pub fn with_base(base: Url, token: Option<String>, limit: usize) -> Self {
        Self {
            client: Client::new(),
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
            base,
            token,
        }
    }

    // Only reads are retried; mutations must not be replayed.
    async fn client(&self, method: &Method) -> Result<(ClientWithMiddleware, SemaphorePermit<'_>)> {
        let semaphore = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;
        let client = if *method == Method::GET {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(RETRY_LIMIT);
            ClientBuilder::new(self.client.clone())
                .with(RetryTransientMiddleware::new_with_policy(retry_policy))
                .build()
        } else {
            ClientBuilder::new(self.client.clone()).build()
        };
        Ok((client, semaphore))
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| FeedError::Validation(format!("invalid path {}: {}", path, e)))
    }

    fn wrap_request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the raw body of a successful response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: Query,
        body: Option<Value>,
    ) -> Result<String> {
        let what = format!("{} {}", method, path);
        let url = self.url(path)?;

        let (client, _semaphore) = self.client(&method).await?;
        let mut request = self.wrap_request(client.request(method, url));
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        debug!("{}", what);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!("{} failed with {}", what, status);
            return Err(FeedError::from_status(status, &text, &what));
        }

        if log_enabled!(log::Level::Trace) {
            trace!("{}", text);
        }
        Ok(text)
    }

    pub async fn fetch<T: DeserializeOwned>(&self, path: &str, query: Query) -> Result<T> {
        let text = self.send(Method::GET, path, query, None).await?;
        decode(path, &text)
    }

    /// Mutation whose response may or may not carry the affected entity.
    pub async fn mutate<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Query,
        body: Option<Value>,
    ) -> Result<Option<T>> {
        let text = self.send(method, path, query, body).await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        // Some endpoints answer with a bare status string instead of the entity.
        Ok(serde_json::from_str(&text).ok())
    }

    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Query,
        body: Option<Value>,
    ) -> Result<()> {
        self.send(method, path, query, body).await.map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(path: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| FeedError::Decode(format!("{}: {}", path, e)))
}
