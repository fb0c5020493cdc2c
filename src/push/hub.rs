//! Client side of the JSON hub protocol spoken by the feed's push endpoint.
//!
//! Every record is a JSON object terminated by `0x1E`. After the websocket
//! opens the client sends a handshake record and the server acknowledges with
//! an empty object. Invocations (`type: 1`) carry a `target` and positional
//! `arguments`; pings (`type: 6`) keep the connection alive in both directions
//! and a close (`type: 7`) may carry an error.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use serde::Deserialize;
use serde_json::Value;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::{EventSource, FeedEvent, PushMessage};
use crate::{
    config::Config,
    error::{FeedError, Result},
    model::{decode::RawFlag, Post, PostId},
};

pub const RECORD_SEPARATOR: char = '\u{1e}';
const PING_INTERVAL: Duration = Duration::from_secs(15);
const BACKOFF_START: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

//==============================================================================
// Framing
//==============================================================================
pub fn handshake() -> String {
    format!(r#"{{"protocol":"json","version":1}}{}"#, RECORD_SEPARATOR)
}

pub fn ping() -> String {
    format!(r#"{{"type":6}}{}"#, RECORD_SEPARATOR)
}

/// Splits one websocket text frame into its records.
pub fn records(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split(RECORD_SEPARATOR)
        .map(str::trim)
        .filter(|record| !record.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    HandshakeAck,
    Event(FeedEvent),
    Ping,
    Close(Option<String>),
    /// Well-formed but of no interest to the feed.
    Ignored,
}

#[derive(Deserialize, Debug)]
struct Record {
    #[serde(rename = "type")]
    kind: Option<u8>,
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    error: Option<String>,
}

pub fn parse_record(record: &str) -> Result<HubMessage> {
    let record: Record = serde_json::from_str(record)?;
    match record.kind {
        None => match record.error {
            Some(error) => Ok(HubMessage::Close(Some(error))),
            None => Ok(HubMessage::HandshakeAck),
        },
        Some(1) => {
            let target = record.target.unwrap_or_default();
            invocation(&target, &record.arguments)
                .map(|event| event.map_or(HubMessage::Ignored, HubMessage::Event))
        }
        Some(6) => Ok(HubMessage::Ping),
        Some(7) => Ok(HubMessage::Close(record.error)),
        Some(kind) => {
            trace!("Ignoring hub message of type {}", kind);
            Ok(HubMessage::Ignored)
        }
    }
}

fn invocation(target: &str, arguments: &[Value]) -> Result<Option<FeedEvent>> {
    let first = || {
        arguments
            .first()
            .ok_or_else(|| FeedError::Decode(format!("{} without arguments", target)))
    };

    let event = match target.to_ascii_lowercase().as_str() {
        "postcreated" => FeedEvent::Created(Post::deserialize(first()?)?),
        "postupdated" => FeedEvent::Updated(Post::deserialize(first()?)?),
        "postdeleted" => FeedEvent::Deleted(
            post_id(first()?).ok_or_else(|| FeedError::Decode("PostDeleted without id".into()))?,
        ),
        "likechanged" => like_changed(first()?, &arguments[1..])?,
        _ => {
            debug!("Ignoring hub target {}", target);
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn post_id(value: &Value) -> Option<PostId> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        Value::Object(map) => ["postId", "id"]
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(post_id),
        _ => None,
    }
}

// Either `{postId, likeCount?, isLiked?}` or positional `postId, count?, liked?`.
fn like_changed(first: &Value, rest: &[Value]) -> Result<FeedEvent> {
    let post_id =
        post_id(first).ok_or_else(|| FeedError::Decode("LikeChanged without post id".into()))?;
    let (count, liked) = match first {
        Value::Object(map) => (
            map.get("likeCount").or_else(|| map.get("count")),
            map.get("isLiked").or_else(|| map.get("liked")),
        ),
        _ => (rest.first(), rest.get(1)),
    };

    let count = match count.filter(|value| !value.is_null()) {
        Some(value) => Some(u32::deserialize(value)?),
        None => None,
    };
    let liked = match liked.filter(|value| !value.is_null()) {
        Some(value) => Some(
            RawFlag::deserialize(value)?
                .into_bool()
                .map_err(FeedError::Decode)?,
        ),
        None => None,
    };

    Ok(FeedEvent::LikeChanged {
        post_id,
        count,
        liked,
    })
}

//==============================================================================
// Reconnect backoff
//==============================================================================
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            next: BACKOFF_START,
        }
    }
}

impl Backoff {
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(BACKOFF_CAP);
        delay
    }

    pub fn reset(&mut self) {
        self.next = BACKOFF_START;
    }
}

//==============================================================================
// Connection
//==============================================================================
#[derive(Debug, Clone)]
pub struct HubClient {
    url: Url,
    token: Option<String>,
}

impl HubClient {
    pub fn new(config: &Config) -> Self {
        Self::with_url(config.hub_url().clone(), config.token())
    }

    pub fn with_url(url: Url, token: Option<String>) -> Self {
        Self { url, token }
    }

    /// Websocket address, with the session token as `access_token`.
    pub fn endpoint(&self) -> String {
        let mut endpoint = self.url.to_string();
        if let Some(token) = &self.token {
            endpoint.push(if self.url.query().is_some() { '&' } else { '?' });
            endpoint.push_str("access_token=");
            endpoint.push_str(&urlencoding::encode(token));
        }
        endpoint
    }

    /// One connection, from handshake until it drops. Returns `Ok` only when
    /// the receiving side went away.
    async fn session(&self, tx: &UnboundedSender<PushMessage>, backoff: &mut Backoff) -> Result<()> {
        let (stream, _) = connect_async(self.endpoint()).await?;
        let (mut write, mut read) = stream.split();
        write.send(Message::Text(handshake())).await?;

        let mut pinger = time::interval(PING_INTERVAL);
        pinger.tick().await;

        loop {
            let frame = tokio::select! {
                _ = pinger.tick() => {
                    write.send(Message::Text(ping())).await?;
                    continue;
                }
                _ = tx.closed() => return Ok(()),
                frame = read.next() => frame,
            };

            let text = match frame {
                None => return Err(FeedError::Push("connection closed".to_string())),
                Some(frame) => match frame? {
                    Message::Text(text) => text,
                    Message::Ping(data) => {
                        write.send(Message::Pong(data)).await?;
                        continue;
                    }
                    Message::Close(frame) => {
                        let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                        return Err(FeedError::Push(format!("closed by server {}", reason)));
                    }
                    _ => continue,
                },
            };

            trace!("hub <- {}", text);
            for record in records(&text) {
                match parse_record(record) {
                    Ok(HubMessage::HandshakeAck) => {
                        info!("Push channel connected");
                        backoff.reset();
                        if tx.send(PushMessage::Connected).is_err() {
                            return Ok(());
                        }
                    }
                    Ok(HubMessage::Event(event)) => {
                        if tx.send(PushMessage::Event(event)).is_err() {
                            return Ok(());
                        }
                    }
                    Ok(HubMessage::Close(error)) => {
                        return Err(FeedError::Push(
                            error.unwrap_or_else(|| "closed by server".to_string()),
                        ));
                    }
                    Ok(HubMessage::Ping | HubMessage::Ignored) => {}
                    Err(err) => warn!("Skipping push record: {}", err),
                }
            }
        }
    }
}

impl EventSource for HubClient {
    fn spawn(self, tx: UnboundedSender<PushMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = Backoff::default();
            loop {
                let reason = match self.session(&tx, &mut backoff).await {
                    Ok(()) => break,
                    Err(err) => err.to_string(),
                };

                let retry_in = backoff.next_delay();
                warn!("{}, reconnecting in {}s", reason, retry_in.as_secs());
                if tx
                    .send(PushMessage::Disconnected { reason, retry_in })
                    .is_err()
                {
                    break;
                }
                time::sleep(retry_in).await;
            }
            debug!("Push channel stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_records() {
        let frame = format!("{{}}{0}{{\"type\":6}}{0}", RECORD_SEPARATOR);
        let parsed: Vec<HubMessage> = records(&frame).map(|r| parse_record(r).unwrap()).collect();
        assert_eq!(parsed, vec![HubMessage::HandshakeAck, HubMessage::Ping]);
        assert!(handshake().ends_with(RECORD_SEPARATOR));
        assert_eq!(records(&handshake()).count(), 1);
    }

    #[test]
    fn invocation_targets_are_case_insensitive() {
        let record = r#"{"type":1,"target":"postcreated","arguments":[
            {"id":5,"title":"hi","createdAt":"2024-01-03T00:00:00Z"}
        ]}"#;
        match parse_record(record).unwrap() {
            HubMessage::Event(FeedEvent::Created(post)) => assert_eq!(post.id, 5),
            other => panic!("unexpected {:?}", other),
        }

        let record = r#"{"type":1,"target":"PostDeleted","arguments":["7"]}"#;
        assert_eq!(
            parse_record(record).unwrap(),
            HubMessage::Event(FeedEvent::Deleted(7))
        );
    }

    #[test]
    fn like_changed_shapes() {
        let record = r#"{"type":1,"target":"LikeChanged","arguments":[{"postId":3,"likeCount":9}]}"#;
        assert_eq!(
            parse_record(record).unwrap(),
            HubMessage::Event(FeedEvent::LikeChanged {
                post_id: 3,
                count: Some(9),
                liked: None
            })
        );

        let record = r#"{"type":1,"target":"LikeChanged","arguments":[3, 4, "1"]}"#;
        assert_eq!(
            parse_record(record).unwrap(),
            HubMessage::Event(FeedEvent::LikeChanged {
                post_id: 3,
                count: Some(4),
                liked: Some(true)
            })
        );
    }

    #[test]
    fn close_and_unknown() {
        assert_eq!(
            parse_record(r#"{"type":7,"error":"bye"}"#).unwrap(),
            HubMessage::Close(Some("bye".to_string()))
        );
        assert_eq!(
            parse_record(r#"{"error":"unsupported protocol"}"#).unwrap(),
            HubMessage::Close(Some("unsupported protocol".to_string()))
        );
        assert_eq!(
            parse_record(r#"{"type":1,"target":"TypingStarted","arguments":[]}"#).unwrap(),
            HubMessage::Ignored
        );
        assert_eq!(parse_record(r#"{"type":3}"#).unwrap(), HubMessage::Ignored);
    }

    #[test]
    fn malformed_records_are_errors() {
        assert!(parse_record("not json").is_err());
        assert!(parse_record(r#"{"type":1,"target":"PostCreated","arguments":[]}"#).is_err());
        assert!(parse_record(r#"{"type":1,"target":"PostDeleted","arguments":[null]}"#).is_err());
        assert!(
            parse_record(r#"{"type":1,"target":"LikeChanged","arguments":[{"postId":1,"isLiked":"maybe"}]}"#)
                .is_err()
        );
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn endpoint_carries_token() {
        let url = Url::parse("ws://localhost:5000/hubs/feed").unwrap();
        let hub = HubClient::with_url(url.clone(), Some("a b&c".to_string()));
        assert_eq!(
            hub.endpoint(),
            "ws://localhost:5000/hubs/feed?access_token=a%20b%26c"
        );
        assert_eq!(
            HubClient::with_url(url, None).endpoint(),
            "ws://localhost:5000/hubs/feed"
        );
    }
}
