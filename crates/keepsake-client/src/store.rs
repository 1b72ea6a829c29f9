use reqwest::StatusCode;
use thiserror::Error;

use keepsake_types::api::SubmitMessageRequest;
use keepsake_types::models::Message;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned {0}")]
    Status(StatusCode),
}

/// The store query interface the view consumes: one ordered read, one insert.
#[allow(async_fn_in_trait)]
pub trait MessageStore {
    type Error: std::fmt::Display;

    /// All rows, ordered by `created_at` descending.
    async fn select_all(&self) -> Result<Vec<Message>, Self::Error>;

    /// Insert one row. The ack is not surfaced: the view learns about the new
    /// row from the change feed, never from the insert's return value.
    async fn insert(&self, row: &SubmitMessageRequest) -> Result<(), Self::Error>;
}

/// `MessageStore` over the server's HTTP API.
pub struct HttpStore {
    client: reqwest::Client,
    messages_url: String,
}

impl HttpStore {
    /// `server_url` is the HTTP base, e.g. `http://127.0.0.1:3000`.
    pub fn new(server_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            messages_url: format!("{}/messages", server_url.trim_end_matches('/')),
        }
    }
}

impl MessageStore for HttpStore {
    type Error = StoreError;

    async fn select_all(&self) -> Result<Vec<Message>, StoreError> {
        let resp = self.client.get(&self.messages_url).send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::Status(resp.status()));
        }
        Ok(resp.json().await?)
    }

    async fn insert(&self, row: &SubmitMessageRequest) -> Result<(), StoreError> {
        let resp = self.client.post(&self.messages_url).json(row).send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::Status(resp.status()));
        }
        // The 201 body echoes the stored row; it is dropped unread.
        Ok(())
    }
}
