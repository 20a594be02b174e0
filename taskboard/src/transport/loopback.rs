//! Loopback push channel for testing.
//!
//! Publishers call [`LoopbackChannel::publish`]; every live subscription to
//! the topic receives a copy. Subscriptions whose receivers were dropped are
//! pruned on the next publish.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use taskboard_proto::channel::Topic;
use taskboard_proto::event::PushEvent;
use tokio::sync::mpsc;

use super::{ChannelError, PushChannel, Subscription};

/// In-process push channel backed by `tokio::sync::mpsc`.
///
/// Cloning shares the subscriber table, so a test can keep one handle for
/// publishing and give another to the code under test.
#[derive(Debug, Clone)]
pub struct LoopbackChannel {
    subscribers: Arc<Mutex<HashMap<Topic, Vec<mpsc::Sender<PushEvent>>>>>,
    buffer: usize,
}

impl LoopbackChannel {
    /// Creates a channel whose subscriptions buffer up to `buffer` events.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            buffer: buffer.max(1),
        }
    }

    /// Delivers `event` to every live subscriber of `topic`.
    ///
    /// Returns the number of subscribers that received it. Full buffers
    /// drop the event for that subscriber.
    pub fn publish(&self, topic: Topic, event: &PushEvent) -> usize {
        let mut table = self.subscribers.lock();
        let Some(senders) = table.get_mut(&topic) else {
            return 0;
        };
        senders.retain(|tx| !tx.is_closed());
        senders
            .iter()
            .filter(|tx| tx.try_send(event.clone()).is_ok())
            .count()
    }

    /// Number of live subscriptions to `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .lock()
            .get(&topic)
            .map_or(0, |senders| senders.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// Closes every subscription to `topic`, as a dropped connection would.
    pub fn disconnect(&self, topic: Topic) {
        self.subscribers.lock().remove(&topic);
    }
}

impl PushChannel for LoopbackChannel {
    async fn subscribe(&self, topic: Topic) -> Result<Subscription, ChannelError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.lock().entry(topic).or_default().push(tx);
        Ok(Subscription::new(topic, rx, None))
    }
}
