//! Networking coordinator for wiring the terminal front end to a board.
//!
//! Builds the REST client and push channel from a [`BoardConfig`], mounts a
//! [`BoardView`], and runs it on a background tokio task. The front end
//! talks to it through channels only:
//!
//! ```text
//! front end  ←── BoardUpdate ───  BoardView::run (tokio task)
//!            ─── BoardCommand →
//! ```

use std::time::Duration;

use taskboard_proto::channel::Topic;
use tokio::sync::mpsc;
use url::Url;

use crate::api::http::HttpTaskApi;
use crate::transport::websocket::WsPushChannel;
use crate::view::{BoardCommand, BoardError, BoardUpdate, BoardView, ViewOptions};

/// Everything needed to mount a board against a live service.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Base URL of the task service REST API.
    pub api_url: Url,
    /// WebSocket URL of the push hub.
    pub push_url: Url,
    /// Which board to show.
    pub scope: Topic,
    /// Per-request REST timeout.
    pub request_timeout: Duration,
    /// Timeout for opening the push connection.
    pub connect_timeout: Duration,
    /// Capacity of the event, command, and update channels.
    pub channel_capacity: usize,
    /// Largest accepted push frame (bytes).
    pub max_frame_size: usize,
    /// Reconnect tunables.
    pub view: ViewOptions,
    /// Initial search query.
    pub query: String,
}

/// Mount a board and run it in the background.
///
/// The board is fully loaded when this returns: the first
/// [`BoardUpdate::Board`] on the receiver reflects the snapshot plus any
/// events that arrived while it was fetched. Dropping the sender (or
/// sending [`BoardCommand::Unmount`]) stops the board and releases its
/// subscription.
///
/// # Errors
///
/// Returns [`BoardError`] if the HTTP client cannot be built, the push
/// channel cannot be joined, or the snapshot cannot be fetched.
pub async fn spawn_board(
    config: BoardConfig,
) -> Result<(mpsc::Sender<BoardCommand>, mpsc::Receiver<BoardUpdate>), BoardError> {
    let api = HttpTaskApi::new(&config.api_url, config.request_timeout)?;
    let channel = WsPushChannel::new(config.push_url.as_str(), config.channel_capacity)
        .with_connect_timeout(config.connect_timeout)
        .with_max_frame_size(config.max_frame_size);

    let (view, subscription) = BoardView::mount(api, &channel, config.scope).await?;
    let mut view = view.with_options(config.view);
    view.set_query(config.query);
    tracing::info!(
        scope = %config.scope,
        api = %config.api_url,
        push = %config.push_url,
        "board mounted"
    );

    let capacity = config.channel_capacity.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let (update_tx, update_rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        view.run(&channel, subscription, cmd_rx, update_tx).await;
    });

    Ok((cmd_tx, update_rx))
}
