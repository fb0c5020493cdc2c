mod api;
mod app;
mod comments;
mod config;
mod draft;
mod error;
mod feed;
mod latest;
mod model;
mod optimistic;
mod push;
mod view;


use std::error::Error;

use api::ApiClient;
use app::reports::group_reports;
use config::{Command, Config};
use feed::sort_posts;
use log::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();
    config.init_logger()?;

    match config.command() {
        Command::Feed => app::run::run(&config).await?,
        Command::List => list_posts(&config).await?,
        Command::Reports => list_reports(&config).await?,
        Command::Post => publish_post(&config).await?,
    }
    Ok(())
}

async fn list_posts(config: &Config) -> error::Result<()> {
    let api = ApiClient::new(config);
    let mut posts = api.get_posts().await?;
    sort_posts(&mut posts);

    info!("# {} posts #", posts.len());
    for post in posts {
        info!(
            "[{}] {} by {} ({} likes, {} comments)",
            post.id,
            post.title,
            post.author(),
            post.like_count,
            post.comment_count
        );
    }
    Ok(())
}

async fn list_reports(config: &Config) -> error::Result<()> {
    let api = ApiClient::new(config);
    let groups = group_reports(api.get_reports().await?);

    info!("# {} reported posts #", groups.len());
    for group in groups {
        info!("post {}: {} report(s)", group.post_id, group.count());
        for reason in group.reasons() {
            info!("  - {}", reason);
        }
    }
    Ok(())
}

async fn publish_post(config: &Config) -> error::Result<()> {
    let text = draft::edit_in_editor()?;
    let post = draft::parse_draft(&text)?;

    let api = ApiClient::new(config);
    match api.create_post(&post).await? {
        Some(created) => info!("Published post {}", created.id),
        None => info!("Published \"{}\"", post.title),
    }
    Ok(())
}
