/// Row type as stored in SQLite. `created_at` stays a string here; the API
/// layer owns the conversion to a typed timestamp.
pub struct MessageRow {
    pub id: i64,
    pub name: String,
    pub message: String,
    pub created_at: String,
}
