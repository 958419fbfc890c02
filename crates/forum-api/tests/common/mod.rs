#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use forum_api::auth::{self, AppState, AppStateInner};
use forum_db::Database;
use forum_db::queries::NewUser;

pub const PASSWORD: &str = "password-123";

/// Ids of the rows seeded by `TestApp::seeded`.
pub struct Fixture {
    pub user1: i64,
    pub user2: i64,
    pub admin: i64,
    pub chapter1: i64,
    pub chapter2: i64,
    /// Categories 1 and 2 live in chapter 1, category 3 in chapter 2.
    pub categories: [i64; 3],
    /// Theme 1 (category 1, user1, open), Theme 2 (category 1, user1, closed),
    /// Theme 3 (category 2, user2, open).
    pub themes: [i64; 3],
    /// content 1 (user1, theme 1), content 2 (user2, theme 1),
    /// content 3 (user1, theme 2).
    pub messages: [i64; 3],
}

pub struct TestApp {
    pub state: AppState,
    pub fixture: Fixture,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// A fresh in-memory forum with two regular users, one staff user and a
    /// small content tree.
    pub fn seeded() -> Result<Self> {
        let db = Database::open_in_memory()?;

        let user1 = create_user(&db, "user1", false)?;
        let user2 = create_user(&db, "user2", false)?;
        let admin = create_user(&db, "admin", true)?;

        let chapter1 = db.insert_chapter("chapter 1", "description 1")?.id;
        let chapter2 = db.insert_chapter("chapter 2", "description 2")?.id;
        let categories = [
            db.insert_category(chapter1, "Category 1", "")?.id,
            db.insert_category(chapter1, "Category 2", "")?.id,
            db.insert_category(chapter2, "Category 3", "")?.id,
        ];
        let themes = [
            db.insert_theme(categories[0], "Theme 1", true, user1)?.id,
            db.insert_theme(categories[0], "Theme 2", false, user1)?.id,
            db.insert_theme(categories[1], "Theme 3", true, user2)?.id,
        ];
        let messages = [
            db.insert_message(user1, themes[0], "content 1")?.id,
            db.insert_message(user2, themes[0], "content 2")?.id,
            db.insert_message(user1, themes[1], "content 3")?.id,
        ];

        let state = Arc::new(AppStateInner {
            db,
            jwt_secret: "integration-test-secret".into(),
            token_ttl: chrono::Duration::days(1),
        });

        Ok(Self {
            state,
            fixture: Fixture {
                user1,
                user2,
                admin,
                chapter1,
                chapter2,
                categories,
                themes,
                messages,
            },
        })
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn router(&self) -> Router {
        forum_api::router(self.state.clone())
    }

    pub fn token(&self, user_id: i64) -> Result<String> {
        let user = self.db().get_user_by_id(user_id)?.context("no such user")?;
        auth::create_token(&self.state, &user)
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn get_as(&self, user_id: i64, uri: &str) -> Result<TestResponse> {
        let token = self.token(user_id)?;
        self.send(Method::GET, uri, Some(&token), None).await
    }

    pub async fn post(&self, user_id: Option<i64>, uri: &str, body: Value) -> Result<TestResponse> {
        let token = user_id.map(|id| self.token(id)).transpose()?;
        self.send(Method::POST, uri, token.as_deref(), Some(body)).await
    }

    pub async fn patch(&self, user_id: Option<i64>, uri: &str, body: Value) -> Result<TestResponse> {
        let token = user_id.map(|id| self.token(id)).transpose()?;
        self.send(Method::PATCH, uri, token.as_deref(), Some(body)).await
    }

    pub async fn delete(&self, user_id: Option<i64>, uri: &str) -> Result<TestResponse> {
        let token = user_id.map(|id| self.token(id)).transpose()?;
        self.send(Method::DELETE, uri, token.as_deref(), None).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| {
                format!("non-JSON body: {}", String::from_utf8_lossy(&bytes))
            })?
        };

        Ok(TestResponse { status, body })
    }
}

fn create_user(db: &Database, username: &str, is_staff: bool) -> Result<i64> {
    let password_hash = auth::hash_password(PASSWORD)?;
    let user = db.create_user(&NewUser {
        username,
        password_hash: &password_hash,
        first_name: "",
        last_name: "",
        is_staff,
    })?;
    Ok(user.id)
}

/// The `id` fields of a JSON array of objects.
pub fn ids(values: &Value) -> Vec<i64> {
    values
        .as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_i64()).collect())
        .unwrap_or_default()
}
