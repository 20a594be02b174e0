//! Push-channel abstraction for `Taskboard`.
//!
//! A [`PushChannel`] hands out [`Subscription`]s, each delivering the
//! [`PushEvent`]s of one [`Topic`] in receipt order. Implementations:
//! - [`websocket::WsPushChannel`]: WebSocket connection to the hub
//! - [`loopback::LoopbackChannel`]: in-process fan-out for tests

pub mod loopback;
pub mod websocket;

use std::future::Future;

use taskboard_proto::channel::Topic;
use taskboard_proto::event::PushEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors that can occur while subscribing.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The connection was closed before the subscription was confirmed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Connecting or joining took too long.
    #[error("push channel operation timed out")]
    Timeout,

    /// The hub could not be reached.
    #[error("push channel unreachable: {0}")]
    Unreachable(String),

    /// The hub refused the subscription.
    #[error("subscription rejected: {0}")]
    Rejected(String),

    /// Protocol or I/O failure.
    #[error("push channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of push-event subscriptions.
pub trait PushChannel: Send + Sync {
    /// Opens a subscription to `topic`.
    ///
    /// Events published after this future resolves are delivered to the
    /// returned [`Subscription`] in the order they were received.
    fn subscribe(
        &self,
        topic: Topic,
    ) -> impl Future<Output = Result<Subscription, ChannelError>> + Send;
}

/// A live subscription. Dropping it releases the underlying listener.
#[derive(Debug)]
pub struct Subscription {
    topic: Topic,
    events: mpsc::Receiver<PushEvent>,
    pump: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wraps a receiver fed by `pump`, which is aborted on drop.
    #[must_use]
    pub const fn new(
        topic: Topic,
        events: mpsc::Receiver<PushEvent>,
        pump: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            topic,
            events,
            pump,
        }
    }

    /// The subscribed topic.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        self.topic
    }

    /// Waits for the next event. `None` means the channel is gone.
    pub async fn next(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    /// Returns an already buffered event without waiting.
    pub fn try_next(&mut self) -> Option<PushEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.events.close();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        tracing::debug!(topic = %self.topic, "subscription released");
    }
}
