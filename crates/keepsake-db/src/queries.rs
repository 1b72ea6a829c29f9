use crate::Database;
use crate::models::MessageRow;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    /// Insert a guestbook entry and read the stored row back, so the caller
    /// gets the server-assigned `id` and `created_at`.
    pub fn insert_message(&self, name: &str, message: &str) -> Result<MessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (name, message) VALUES (?1, ?2)",
                (name, message),
            )?;
            // The connection mutex serializes writers, so the rowid is ours.
            let id = conn.last_insert_rowid();
            query_message_by_id(conn, id)
        })
    }

    /// All rows, newest first. No LIMIT: the guestbook has no pagination.
    pub fn list_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(query_messages)
    }
}

fn query_message_by_id(conn: &Connection, id: i64) -> Result<MessageRow> {
    let row = conn.query_row(
        "SELECT id, name, message, created_at FROM messages WHERE id = ?1",
        [id],
        |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                name: row.get(1)?,
                message: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )?;

    Ok(row)
}

fn query_messages(conn: &Connection) -> Result<Vec<MessageRow>> {
    // created_at is ISO-8601 text, so lexicographic order is chronological.
    let mut stmt = conn.prepare(
        "SELECT id, name, message, created_at
         FROM messages
         ORDER BY created_at DESC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                name: row.get(1)?,
                message: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
