use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use forum_db::models::{MessageChanges, MessageFilter};
use forum_db::{Database, ListOrder};
use forum_types::api::MessagePayload;

use crate::auth::AppState;
use crate::error::{ApiError, FieldErrors};
use crate::pagination::PageParams;
use crate::permissions::{Permission, Requester};
use crate::{projections, run_db, validation};

pub const CLOSED_THEME: &str = "Cannot create a message in a closed theme.";

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub theme: Option<String>,
    pub user: Option<String>,
    pub ordering: Option<String>,
}

/// GET /messages/?theme=&user=&ordering=&page=
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    Query(paging): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::default();
    let filter = MessageFilter {
        theme_id: validation::id_filter(&mut errors, "theme", query.theme.as_deref()),
        user_id: validation::id_filter(&mut errors, "user", query.user.as_deref()),
    };
    errors.finish()?;
    let order = query.ordering.as_deref().and_then(ListOrder::parse).unwrap_or_default();

    let page = run_db(&state, move |db| {
        let count = db.count_messages(&filter)?;
        let window = paging.window(count)?;
        let rows = db.list_messages(&filter, order, window.limit(), window.offset())?;
        Ok(window.into_page(count, rows.into_iter().map(projections::message_view).collect()))
    })
    .await?;
    Ok(Json(page))
}

/// GET /messages/{id}/
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_db(&state, move |db| db.get_message(id)?.ok_or(ApiError::NotFound)).await?;
    Ok(Json(projections::message_view(row)))
}

/// POST /messages/create/: any authenticated user, into an open theme only.
pub async fn create_message(
    State(state): State<AppState>,
    requester: Requester,
    payload: Result<Json<MessagePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let mut errors = FieldErrors::default();
    let theme = validation::required_pk(&mut errors, "theme", req.theme);
    let content = validation::required_text(&mut errors, "content", req.content, None);
    let (Some(theme), Some(content)) = (theme, content) else {
        return Err(errors.into());
    };

    let author = requester.id;
    let message = run_db(&state, move |db| {
        if let Some(message) = db.insert_message_into_open_theme(author, theme, &content)? {
            return Ok(message);
        }
        // Nothing was written: the theme is missing or closed.
        ensure_theme(db, theme)?;
        warn!("Rejected message for closed theme {}", theme);
        Err(FieldErrors::single("theme", CLOSED_THEME).into())
    })
    .await?;

    info!("Message {} posted to theme {} by {}", message.id, theme, requester.username);
    Ok((StatusCode::CREATED, Json(projections::message_record(message))))
}

/// PATCH /messages/update/{id}/: owner or staff.
pub async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    requester: Requester,
    payload: Result<Json<MessagePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id = run_db(&state, move |db| Ok(db.get_message(id)?.ok_or(ApiError::NotFound)?.user_id)).await?;
    Permission::OwnerOrAdmin { owner_id }.check(&requester)?;

    let Json(req) = payload?;
    let mut errors = FieldErrors::default();
    let changes = MessageChanges {
        theme_id: validation::pk(&mut errors, "theme", req.theme),
        content: validation::optional_text(&mut errors, "content", req.content, None),
    };
    errors.finish()?;

    let message = run_db(&state, move |db| {
        if let Some(theme) = changes.theme_id {
            ensure_theme(db, theme)?;
        }
        db.update_message(id, &changes)?.ok_or(ApiError::NotFound)
    })
    .await?;

    Ok(Json(projections::message_view(message)))
}

/// DELETE /messages/delete/{id}/: staff only.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    requester: Requester,
) -> Result<impl IntoResponse, ApiError> {
    Permission::Admin.check(&requester)?;

    if !run_db(&state, move |db| Ok(db.delete_message(id)?)).await? {
        return Err(ApiError::NotFound);
    }

    info!("Message {} deleted by {}", id, requester.username);
    Ok(StatusCode::NO_CONTENT)
}

fn ensure_theme(db: &Database, theme: i64) -> Result<(), ApiError> {
    if db.get_theme(theme)?.is_none() {
        return Err(FieldErrors::single("theme", validation::missing_object(theme)).into());
    }
    Ok(())
}
