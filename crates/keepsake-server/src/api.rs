use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{error, warn};

use keepsake_db::Database;
use keepsake_db::models::MessageRow;
use keepsake_types::api::SubmitMessageRequest;
use keepsake_types::events::FeedEvent;
use keepsake_types::models::Message;

use crate::feed::Feed;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub feed: Feed,
}

/// GET /messages — every guestbook entry, newest first.
pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    // Run the blocking DB query off the async runtime
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_messages())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("listing messages failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let messages: Vec<Message> = rows.into_iter().map(row_to_message).collect();
    Ok(Json(messages))
}

/// POST /messages — insert a guestbook entry, then publish the stored row to
/// the feed. The feed event goes out only after the insert is durable.
pub async fn create_message(
    State(state): State<AppState>,
    Json(req): Json<SubmitMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // The store owns the non-empty column invariant. Clients already no-op on
    // empty fields, so anything arriving here empty is a misbehaving caller.
    if req.name.trim().is_empty() || req.message.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Run the blocking DB insert off the async runtime
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.insert_message(&req.name, &req.message))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("message insert failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let message = row_to_message(row);

    state.feed.publish(FeedEvent::MessageCreate {
        message: message.clone(),
    });

    Ok((StatusCode::CREATED, Json(message)))
}

fn row_to_message(row: MessageRow) -> Message {
    Message {
        id: row.id,
        name: row.name,
        message: row.message,
        created_at: row
            .created_at
            .parse::<DateTime<Utc>>()
            .or_else(|_| {
                // Our schema default writes RFC 3339 with a Z suffix, but rows
                // written by other SQLite tools may carry the bare
                // "YYYY-MM-DD HH:MM:SS" form. Parse as naive UTC and convert.
                NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                    .map(|ndt| ndt.and_utc())
            })
            .unwrap_or_else(|e| {
                warn!(
                    "Corrupt created_at '{}' on message {}: {}",
                    row.created_at, row.id, e
                );
                DateTime::default()
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(created_at: &str) -> MessageRow {
        MessageRow {
            id: 1,
            name: "A".to_string(),
            message: "hi".to_string(),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn converts_rfc3339_timestamps() {
        let m = row_to_message(row("2024-01-02T00:00:00.000Z"));
        assert_eq!(
            m.created_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn falls_back_to_bare_sqlite_form() {
        let m = row_to_message(row("2024-01-02 00:00:00"));
        assert_eq!(
            m.created_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn corrupt_timestamps_become_the_epoch_default() {
        let m = row_to_message(row("not a timestamp"));
        assert_eq!(m.created_at, DateTime::<Utc>::default());
    }
}
