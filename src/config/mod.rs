pub mod command;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use dotenv::dotenv;
use std::{fs::OpenOptions, path::PathBuf};
use url::Url;

use crate::{error::Result, model::UserId};

pub use command::Command;

#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// What to do
    #[arg(value_enum, default_value_t = Command::Feed)]
    command: Command,
    /// Base URL of the feed API
    #[arg(long, env = "FEED_API_URL", default_value = "http://localhost:5000")]
    api_url: Url,
    /// Websocket URL of the push hub
    #[arg(long, env = "FEED_HUB_URL", default_value = "ws://localhost:5000/hubs/feed")]
    hub_url: Url,
    /// Your session token
    #[arg(long, env = "FEED_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Your user id, enables editing your own posts and comments
    #[arg(long, env = "FEED_USER_ID")]
    user_id: Option<UserId>,
    /// Show the moderation screen
    #[arg(long)]
    admin: bool,
    /// Limit request concurrency
    #[arg(long, default_value = "5")]
    limit: usize,
    /// Where logs go while the interactive feed owns the terminal
    #[arg(long, default_value = "feed-client.log")]
    log_file: PathBuf,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Config {
    /// Parse the configuration from the environment and command line arguments
    pub fn parse() -> Self {
        dotenv().ok();
        <Self as Parser>::parse()
    }
    /// Create a logger with the configured verbosity level
    pub fn init_logger(&self) -> Result<()> {
        let mut builder = env_logger::Builder::new();
        builder
            .filter_level(self.verbose.log_level_filter())
            .format_target(false);

        if self.command.is_interactive() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_file)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        builder.init();
        Ok(())
    }
    /// Get the session token, without a `Bearer ` prefix
    pub fn token(&self) -> Option<String> {
        let token = self.token.as_deref()?.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        (!token.is_empty()).then(|| token.to_string())
    }
    pub const fn command(&self) -> Command {
        self.command
    }
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }
    pub const fn hub_url(&self) -> &Url {
        &self.hub_url
    }
    pub const fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
    pub const fn admin(&self) -> bool {
        self.admin
    }
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let config = Config::try_parse_from([
            "feed-client",
            "list",
            "--api-url",
            "http://api.test",
            "--token",
            "Bearer abc",
            "--user-id",
            "4",
            "--admin",
        ])
        .unwrap();

        assert_eq!(config.command(), Command::List);
        assert_eq!(config.api_url().as_str(), "http://api.test/");
        assert_eq!(config.token().as_deref(), Some("abc"));
        assert_eq!(config.user_id(), Some(4));
        assert!(config.admin());
        assert!(!config.command().is_interactive());
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(Config::try_parse_from(["feed-client", "--hub-url", "not a url"]).is_err());
    }
}
