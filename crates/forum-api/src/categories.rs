use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use forum_db::Database;
use forum_db::models::CategoryChanges;
use forum_types::api::CategoryPayload;

use crate::auth::AppState;
use crate::error::{ApiError, FieldErrors};
use crate::permissions::{Permission, Requester};
use crate::validation::{self, NAME_MAX_CHARS};
use crate::{projections, run_db};

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub chapter: Option<String>,
}

/// GET /categories/?chapter=: unpaginated.
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::default();
    let chapter = validation::id_filter(&mut errors, "chapter", query.chapter.as_deref());
    errors.finish()?;

    let categories = run_db(&state, move |db| {
        Ok(projections::category_summaries(db, db.list_categories(chapter)?)?)
    })
    .await?;
    Ok(Json(categories))
}

/// GET /categories/{id}/: themes embedded.
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let category = run_db(&state, move |db| {
        let row = db.get_category(id)?.ok_or(ApiError::NotFound)?;
        Ok(projections::category_detail(db, row)?)
    })
    .await?;
    Ok(Json(category))
}

/// POST /categories/create/: staff only.
pub async fn create_category(
    State(state): State<AppState>,
    requester: Requester,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    Permission::Admin.check(&requester)?;
    let Json(req) = payload?;

    let mut errors = FieldErrors::default();
    let chapter = validation::required_pk(&mut errors, "chapter", req.chapter);
    let name = validation::required_text(&mut errors, "name", req.name, Some(NAME_MAX_CHARS));
    let description = validation::text(&mut errors, "description", req.description).unwrap_or_default();
    let (Some(chapter), Some(name)) = (chapter, name) else {
        return Err(errors.into());
    };
    errors.finish()?;

    let category = run_db(&state, move |db| {
        ensure_chapter(db, chapter)?;
        Ok(db.insert_category(chapter, &name, &description)?)
    })
    .await?;

    info!("Category {} created by {}", category.id, requester.username);
    Ok((StatusCode::CREATED, Json(projections::category_record(category))))
}

/// PATCH /categories/update/{id}/: staff only; may move the category to another chapter.
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    requester: Requester,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    Permission::Admin.check(&requester)?;
    let Json(req) = payload?;

    let mut errors = FieldErrors::default();
    let changes = CategoryChanges {
        chapter_id: validation::pk(&mut errors, "chapter", req.chapter),
        name: validation::optional_text(&mut errors, "name", req.name, Some(NAME_MAX_CHARS)),
        description: validation::text(&mut errors, "description", req.description),
    };
    errors.finish()?;

    let category = run_db(&state, move |db| {
        if db.get_category(id)?.is_none() {
            return Err(ApiError::NotFound);
        }
        if let Some(chapter) = changes.chapter_id {
            ensure_chapter(db, chapter)?;
        }
        db.update_category(id, &changes)?.ok_or(ApiError::NotFound)
    })
    .await?;

    Ok(Json(projections::category_record(category)))
}

/// DELETE /categories/update/{id}/: staff only.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    requester: Requester,
) -> Result<impl IntoResponse, ApiError> {
    Permission::Admin.check(&requester)?;

    if !run_db(&state, move |db| Ok(db.delete_category(id)?)).await? {
        return Err(ApiError::NotFound);
    }

    info!("Category {} deleted by {}", id, requester.username);
    Ok(StatusCode::NO_CONTENT)
}

fn ensure_chapter(db: &Database, chapter: i64) -> Result<(), ApiError> {
    if db.get_chapter(chapter)?.is_none() {
        return Err(FieldErrors::single("chapter", validation::missing_object(chapter)).into());
    }
    Ok(())
}
