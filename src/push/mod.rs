pub mod hub;

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};

use crate::model::{Post, PostId};

/// A live change to the feed, as delivered by the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Created(Post),
    Updated(Post),
    Deleted(PostId),
    LikeChanged {
        post_id: PostId,
        count: Option<u32>,
        liked: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Connected,
    /// The connection dropped; a reconnect is scheduled after the delay.
    Disconnected { reason: String, retry_in: std::time::Duration },
    Event(FeedEvent),
}

/// Anything that produces push messages. The transport lifecycle lives in
/// the spawned task; consumers only see the typed stream.
pub trait EventSource {
    fn spawn(self, tx: UnboundedSender<PushMessage>) -> JoinHandle<()>;
}
