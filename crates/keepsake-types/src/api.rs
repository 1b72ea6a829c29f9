use serde::{Deserialize, Serialize};

/// Body of `POST /messages`.
///
/// The persisted column is `message` even though the view keeps the field as
/// `text`; the rename happens at the submit call site, never on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitMessageRequest {
    pub name: String,
    pub message: String,
}
