/// Database row types: these map directly to SQLite rows.
/// Distinct from forum-types projections to keep the DB layer independent.

#[derive(Debug)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub date_joined: String,
    pub token_version: i64,
}

#[derive(Debug)]
pub struct ChapterRow {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug)]
pub struct CategoryRow {
    pub id: i64,
    pub chapter_id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug)]
pub struct ThemeRow {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub status: bool,
    pub user_id: i64,
    pub created_at: String,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub theme_id: i64,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    /// Relations on this message with `liked = 1`.
    pub likes_count: i64,
}

#[derive(Debug)]
pub struct RelationRow {
    pub id: i64,
    pub user_id: i64,
    pub message_id: i64,
    pub like: bool,
}

// -- Changesets for partial updates; `None` leaves the column untouched --

#[derive(Default)]
pub struct ChapterChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct CategoryChanges {
    pub chapter_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct ThemeChanges {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub status: Option<bool>,
}

#[derive(Default)]
pub struct MessageChanges {
    pub theme_id: Option<i64>,
    pub content: Option<String>,
}

// -- List filters --

#[derive(Default)]
pub struct ThemeFilter {
    pub category_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: Option<bool>,
}

#[derive(Default)]
pub struct MessageFilter {
    pub theme_id: Option<i64>,
    pub user_id: Option<i64>,
}
