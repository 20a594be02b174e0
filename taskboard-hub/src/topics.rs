//! Topic registry for push connections.
//!
//! Each WebSocket connection joins exactly one [`Topic`]. Publishing to a
//! topic encodes the frame once and hands it to every joined connection's
//! writer task. Writers that have gone away are pruned on publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use taskboard_proto::channel::{ChannelMessage, Topic};
use taskboard_proto::codec;
use tokio::sync::{RwLock, mpsc};

/// Identifies one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

type Sender = mpsc::UnboundedSender<Message>;

/// Result of joining a topic.
#[derive(Debug)]
pub struct JoinOutcome {
    /// Connections that were on the topic before this one.
    pub previous: usize,
    /// Connections removed because the join was exclusive.
    pub displaced: Vec<Sender>,
}

/// Thread-safe map from topic to joined connections.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    next_id: AtomicU64,
    topics: RwLock<HashMap<Topic, Vec<(ConnectionId, Sender)>>>,
}

impl TopicRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id for a new connection.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Adds a connection to `topic`.
    ///
    /// With `exclusive`, every other connection on the topic is removed and
    /// returned so the caller can tell it to go away.
    pub async fn join(
        &self,
        topic: Topic,
        conn: ConnectionId,
        sender: Sender,
        exclusive: bool,
    ) -> JoinOutcome {
        let mut topics = self.topics.write().await;
        let entry = topics.entry(topic).or_default();
        entry.retain(|(_, tx)| !tx.is_closed());
        let previous = entry.len();
        let displaced = if exclusive {
            entry.drain(..).map(|(_, tx)| tx).collect()
        } else {
            Vec::new()
        };
        entry.push((conn, sender));
        JoinOutcome {
            previous,
            displaced,
        }
    }

    /// Removes a connection from `topic`. Returns how many remain.
    pub async fn leave(&self, topic: Topic, conn: ConnectionId) -> usize {
        let mut topics = self.topics.write().await;
        let Some(entry) = topics.get_mut(&topic) else {
            return 0;
        };
        entry.retain(|(id, tx)| *id != conn && !tx.is_closed());
        let remaining = entry.len();
        if remaining == 0 {
            topics.remove(&topic);
        }
        remaining
    }

    /// Sends `msg` to every connection on `topic`. Returns the number of
    /// connections it was handed to.
    pub async fn publish(&self, topic: Topic, msg: &ChannelMessage) -> usize {
        let bytes = match codec::encode(msg) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(%topic, error = %e, "failed to encode push frame");
                return 0;
            }
        };
        let mut topics = self.topics.write().await;
        let Some(entry) = topics.get_mut(&topic) else {
            return 0;
        };
        entry.retain(|(conn, tx)| {
            let sent = tx.send(Message::Binary(bytes.clone().into())).is_ok();
            if !sent {
                tracing::debug!(%topic, %conn, "pruning closed connection");
            }
            sent
        });
        entry.len()
    }

    /// Number of live connections on `topic`.
    pub async fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics
            .read()
            .await
            .get(&topic)
            .map_or(0, |entry| entry.iter().filter(|(_, tx)| !tx.is_closed()).count())
    }

    /// Sends a Close frame to every connection.
    ///
    /// Each writer task forwards the close, which ends the client's reader.
    pub async fn close_all_connections(&self) {
        let topics = self.topics.read().await;
        for (topic, entry) in topics.iter() {
            for (conn, tx) in entry {
                tracing::info!(%topic, %conn, "sending close frame");
                let _ = tx.send(Message::Close(None));
            }
        }
    }
}
