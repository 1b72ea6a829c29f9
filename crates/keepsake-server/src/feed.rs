use std::sync::Arc;

use tokio::sync::broadcast;

use keepsake_types::events::FeedEvent;

/// Fans insert events out to every connected feed subscriber.
///
/// Cheap to clone; all clones publish into the same channel. Dropping a
/// receiver is the unsubscribe.
#[derive(Clone)]
pub struct Feed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    /// Broadcast channel for feed events — all subscribers receive all events.
    broadcast_tx: broadcast::Sender<FeedEvent>,
}

impl Feed {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(FeedInner { broadcast_tx }),
        }
    }

    /// Subscribe to feed events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event to all connected subscribers. A failed send only
    /// means nobody is listening right now.
    pub fn publish(&self, event: FeedEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use keepsake_types::models::Message;

    fn event(id: i64) -> FeedEvent {
        FeedEvent::MessageCreate {
            message: Message {
                id,
                name: "A".to_string(),
                message: "hi".to_string(),
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let feed = Feed::new();
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();

        feed.publish(event(1));

        let FeedEvent::MessageCreate { message } = first.recv().await.unwrap();
        assert_eq!(message.id, 1);
        let FeedEvent::MessageCreate { message } = second.recv().await.unwrap();
        assert_eq!(message.id, 1);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let feed = Feed::new();
        feed.publish(event(1));
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let feed = Feed::new();
        feed.publish(event(1));

        let mut rx = feed.subscribe();
        feed.publish(event(2));

        let FeedEvent::MessageCreate { message } = rx.recv().await.unwrap();
        assert_eq!(message.id, 2);
    }
}
