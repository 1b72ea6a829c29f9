use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Events pushed over the `/feed` WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedEvent {
    /// A new row was inserted into `messages`, carrying the full stored row.
    MessageCreate { message: Message },
}
