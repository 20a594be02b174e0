//! WebSocket push channel backed by the `Taskboard` hub.
//!
//! Each [`Subscription`] owns one WebSocket connection: the client sends a
//! `Join` frame for its topic, waits for `Joined`, then a background reader
//! forwards `Event` frames into the subscription in receipt order.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use taskboard_proto::channel::{ChannelMessage, Topic};
use taskboard_proto::codec;
use taskboard_proto::event::PushEvent;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{ChannelError, PushChannel, Subscription};

type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Default timeout for opening the WebSocket.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the hub's `Joined` acknowledgment.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Push channel that opens one hub connection per subscription.
#[derive(Debug, Clone)]
pub struct WsPushChannel {
    url: String,
    buffer: usize,
    connect_timeout: Duration,
    max_frame_size: usize,
}

impl WsPushChannel {
    /// Creates a channel for the hub at `url` (`ws://` or `wss://`).
    #[must_use]
    pub fn new(url: impl Into<String>, buffer: usize) -> Self {
        Self {
            url: url.into(),
            buffer: buffer.max(1),
            connect_timeout: CONNECT_TIMEOUT,
            max_frame_size: 64 * 1024,
        }
    }

    /// Overrides the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the largest accepted frame.
    #[must_use]
    pub const fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// The hub URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PushChannel for WsPushChannel {
    /// Connects, joins `topic`, and starts the background reader.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Timeout`] if connecting or joining times out.
    /// - [`ChannelError::Unreachable`] if the hub cannot be reached.
    /// - [`ChannelError::Rejected`] if the hub answers the join with an error.
    /// - [`ChannelError::Io`] for protocol failures.
    async fn subscribe(&self, topic: Topic) -> Result<Subscription, ChannelError> {
        let (ws_stream, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
                .map_err(|_| {
                    tracing::warn!(url = %self.url, "hub WebSocket connect timed out");
                    ChannelError::Timeout
                })?
                .map_err(|e| {
                    tracing::warn!(url = %self.url, err = %e, "hub WebSocket connect failed");
                    map_ws_connect_error(e)
                })?;

        let (mut ws_sender, mut ws_reader) = ws_stream.split();

        let join = codec::encode(&ChannelMessage::Join { topic })
            .map_err(|e| ChannelError::Io(std::io::Error::other(e)))?;
        ws_sender
            .send(Message::Binary(join.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "failed to send Join frame");
                ChannelError::Io(std::io::Error::other(format!("failed to send Join: {e}")))
            })?;

        let ack = tokio::time::timeout(JOIN_TIMEOUT, ws_reader.next())
            .await
            .map_err(|_| {
                tracing::warn!(url = %self.url, %topic, "join acknowledgment timed out");
                ChannelError::Timeout
            })?;

        match ack {
            Some(Ok(Message::Binary(data))) => {
                match codec::decode_bounded(&data, self.max_frame_size) {
                    Ok(ChannelMessage::Joined { topic: joined }) if joined == topic => {
                        tracing::info!(%topic, url = %self.url, "joined push topic");
                    }
                    Ok(ChannelMessage::Error { reason }) => {
                        tracing::warn!(%reason, "join rejected");
                        return Err(ChannelError::Rejected(reason));
                    }
                    Ok(other) => {
                        tracing::warn!(?other, "unexpected frame during join");
                        return Err(ChannelError::Io(std::io::Error::other(
                            "unexpected response during join",
                        )));
                    }
                    Err(e) => {
                        tracing::warn!(err = %e, "malformed join response");
                        return Err(ChannelError::Io(std::io::Error::other(format!(
                            "malformed join response: {e}"
                        ))));
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                tracing::warn!("hub closed connection during join");
                return Err(ChannelError::ConnectionClosed);
            }
            Some(Ok(_)) => {
                return Err(ChannelError::Io(std::io::Error::other(
                    "unexpected non-binary frame during join",
                )));
            }
            Some(Err(e)) => {
                return Err(ChannelError::Io(std::io::Error::other(format!(
                    "WebSocket error during join: {e}"
                ))));
            }
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        let max_frame_size = self.max_frame_size;
        let pump = tokio::spawn(async move {
            reader_loop(ws_reader, tx, topic, max_frame_size).await;
            // Keep the write half alive until the reader is done.
            drop(ws_sender);
        });
        Ok(Subscription::new(topic, rx, Some(pump)))
    }
}

/// Forwards `Event` frames to `tx` until the connection or receiver closes.
///
/// Malformed frames are logged and skipped. A `ForceDisconnect` from the hub
/// ends the loop.
async fn reader_loop(
    mut ws_reader: WsReader,
    tx: mpsc::Sender<PushEvent>,
    topic: Topic,
    max_frame_size: usize,
) {
    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Binary(data)) => match codec::decode_bounded(&data, max_frame_size) {
                Ok(ChannelMessage::Event(event)) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(ChannelMessage::ForceDisconnect { reason }) => {
                    tracing::warn!(%topic, %reason, "hub forced disconnect");
                    break;
                }
                Ok(ChannelMessage::Error { reason }) => {
                    tracing::warn!(%topic, %reason, "hub error");
                }
                Ok(other) => {
                    tracing::debug!(?other, "unexpected push frame");
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed push frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!(%topic, "hub closed push connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(err = %e, "push connection read error");
                break;
            }
        }
    }
    tracing::info!(%topic, "push reader exiting");
}

fn map_ws_connect_error(err: tokio_tungstenite::tungstenite::Error) -> ChannelError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::ConnectionRefused
                || io_err.kind() == std::io::ErrorKind::AddrNotAvailable
            {
                ChannelError::Unreachable(io_err.to_string())
            } else {
                ChannelError::Io(io_err)
            }
        }
        WsError::Http(response) => ChannelError::Unreachable(format!(
            "hub HTTP error: status {}",
            response.status()
        )),
        other => ChannelError::Io(std::io::Error::other(format!(
            "hub connection error: {other}"
        ))),
    }
}
