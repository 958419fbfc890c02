use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Claims carried by the bearer token. `sub` is the user id and `ver` the
/// user's token version at issue time; logging out bumps the version. Staff
/// status is not carried here; it is read from the users table on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub ver: i64,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub current_password: String,
}

// -- Write payloads --
//
// Every field is optional so the same payload serves create (where the
// handler enforces required fields) and partial update. Fields are `Lenient`
// so a wrongly typed value is reported against its own field.

/// A payload value of the expected type, or whatever JSON arrived instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Lenient<T> {
    Valid(T),
    Invalid(serde_json::Value),
}

#[derive(Debug, Default, Deserialize)]
pub struct ChapterPayload {
    pub name: Option<Lenient<String>>,
    pub description: Option<Lenient<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryPayload {
    pub chapter: Option<Lenient<i64>>,
    pub name: Option<Lenient<String>>,
    pub description: Option<Lenient<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThemePayload {
    pub category: Option<Lenient<i64>>,
    pub name: Option<Lenient<String>>,
    pub status: Option<Lenient<bool>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagePayload {
    pub theme: Option<Lenient<i64>>,
    pub content: Option<Lenient<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LikePayload {
    pub message: Option<Lenient<i64>>,
    pub like: Option<Lenient<bool>>,
}

// -- Pagination --

/// Page-number pagination envelope. `next` and `previous` are page numbers.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}
