use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Read projections come in two depths: summaries reference children by id,
// details embed the child summaries. `*Record` types echo a write back with
// foreign keys as plain ids.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

// -- Chapters --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub categories: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterDetail {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub categories: Vec<CategorySummary>,
}

// -- Categories --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: i64,
    pub chapter: ChapterSummary,
    pub name: String,
    pub description: String,
    pub themes: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDetail {
    pub id: i64,
    pub chapter: ChapterSummary,
    pub name: String,
    pub description: String,
    pub themes: Vec<ThemeSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub chapter: i64,
    pub name: String,
    pub description: String,
}

// -- Themes --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSummary {
    pub id: i64,
    pub category: CategorySummary,
    pub name: String,
    pub status: bool,
    pub user: i64,
    pub messages: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeDetail {
    pub id: i64,
    pub category: CategorySummary,
    pub name: String,
    pub status: bool,
    pub user: i64,
    pub messages: Vec<MessageView>,
    pub created_at: DateTime<Utc>,
    pub messages_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRecord {
    pub id: i64,
    pub category: i64,
    pub name: String,
    pub status: bool,
    pub user: i64,
}

// -- Messages --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub user: i64,
    pub theme: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub user: i64,
    pub theme: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Likes --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    pub user: i64,
    pub message: i64,
    pub like: bool,
}
