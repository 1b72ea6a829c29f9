use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;
use tracing::warn;
use url::Url;

use keepsake_types::events::FeedEvent;
use keepsake_types::models::Message;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
    #[error("feed connection failed: {0}")]
    Connect(#[from] tungstenite::Error),
}

/// The change-feed interface the view consumes: a subscription to row-insert
/// events on the message store.
#[allow(async_fn_in_trait)]
pub trait ChangeFeed {
    type Error: std::fmt::Display;

    async fn subscribe(&self) -> Result<Subscription, Self::Error>;
}

/// Teardown handle for an open change-feed subscription.
///
/// `next()` yields each inserted row; once the subscription is closed it
/// yields `None` and anything still in flight is discarded. `unsubscribe` is
/// idempotent and also runs on drop, so release happens exactly once however
/// the owning view goes away.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Message>,
    forward: Option<JoinHandle<()>>,
    closed: bool,
}

impl Subscription {
    /// Wrap a notification channel. `forward` is the task pumping the
    /// transport into the channel; it is aborted on unsubscribe.
    pub fn new(rx: mpsc::UnboundedReceiver<Message>, forward: Option<JoinHandle<()>>) -> Self {
        Self {
            rx,
            forward,
            closed: false,
        }
    }

    /// The next insert notification, or `None` once the subscription is
    /// closed or the transport is gone.
    pub async fn next(&mut self) -> Option<Message> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    /// Close the subscription and release the transport. Safe to call any
    /// number of times.
    pub fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(forward) = self.forward.take() {
            forward.abort();
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// `ChangeFeed` over the server's `/feed` WebSocket.
pub struct WsFeed {
    feed_url: String,
}

impl WsFeed {
    /// `server_url` is the HTTP base; the feed lives at the same host with
    /// the scheme swapped to ws/wss and `/feed` appended.
    pub fn new(server_url: &str) -> Result<Self, FeedError> {
        // Catch a malformed base here rather than on the first subscribe.
        Url::parse(server_url)?;
        let feed_url = format!(
            "{}/feed",
            server_url
                .trim_end_matches('/')
                .replace("http://", "ws://")
                .replace("https://", "wss://")
        );
        Ok(Self { feed_url })
    }
}

impl ChangeFeed for WsFeed {
    type Error = FeedError;

    async fn subscribe(&self) -> Result<Subscription, FeedError> {
        let (socket, _) = tokio_tungstenite::connect_async(self.feed_url.as_str()).await?;
        let (tx, rx) = mpsc::unbounded_channel();

        // Decode feed frames and forward the carried rows until either side
        // goes away. Pings are answered by tungstenite while we keep reading.
        let forward = tokio::spawn(async move {
            let (_write, mut read) = socket.split();
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(tungstenite::Message::Text(text)) => {
                        match serde_json::from_str::<FeedEvent>(&text) {
                            Ok(FeedEvent::MessageCreate { message }) => {
                                if tx.send(message).is_err() {
                                    break; // unsubscribed
                                }
                            }
                            Err(e) => warn!("undecodable feed frame: {}", e),
                        }
                    }
                    Ok(tungstenite::Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        // Live updates stop here; the view keeps whatever it has.
                        warn!("feed connection lost: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(rx, Some(forward)))
    }
}
