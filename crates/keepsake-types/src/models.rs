use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single guestbook entry.
///
/// `id` and `created_at` are assigned by the store at insert time; clients
/// never generate either. `id` is strictly increasing and doubles as the
/// rendering key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
