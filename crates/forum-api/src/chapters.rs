use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use forum_db::models::ChapterChanges;
use forum_types::api::ChapterPayload;

use crate::auth::AppState;
use crate::error::{ApiError, FieldErrors};
use crate::permissions::{Permission, Requester};
use crate::validation::{self, NAME_MAX_CHARS};
use crate::{projections, run_db};

/// GET /chapters/: unpaginated, categories as ids.
pub async fn list_chapters(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let chapters = run_db(&state, |db| Ok(projections::chapter_summaries(db, db.list_chapters()?)?)).await?;
    Ok(Json(chapters))
}

/// GET /chapters/{id}/: categories embedded.
pub async fn get_chapter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let chapter = run_db(&state, move |db| {
        let row = db.get_chapter(id)?.ok_or(ApiError::NotFound)?;
        Ok(projections::chapter_detail(db, row)?)
    })
    .await?;
    Ok(Json(chapter))
}

/// POST /chapters/create/: staff only.
pub async fn create_chapter(
    State(state): State<AppState>,
    requester: Requester,
    payload: Result<Json<ChapterPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    Permission::Admin.check(&requester)?;
    let Json(req) = payload?;

    let mut errors = FieldErrors::default();
    let name = validation::required_text(&mut errors, "name", req.name, Some(NAME_MAX_CHARS));
    let description = validation::text(&mut errors, "description", req.description).unwrap_or_default();
    let Some(name) = name else {
        return Err(errors.into());
    };
    errors.finish()?;

    let chapter = run_db(&state, move |db| {
        let row = db.insert_chapter(&name, &description)?;
        Ok(projections::chapter_summary(db, row)?)
    })
    .await?;

    info!("Chapter {} created by {}", chapter.id, requester.username);
    Ok((StatusCode::CREATED, Json(chapter)))
}

/// PATCH /chapters/update/{id}/: staff only.
pub async fn update_chapter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    requester: Requester,
    payload: Result<Json<ChapterPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    Permission::Admin.check(&requester)?;
    let Json(req) = payload?;

    let mut errors = FieldErrors::default();
    let changes = ChapterChanges {
        name: validation::optional_text(&mut errors, "name", req.name, Some(NAME_MAX_CHARS)),
        description: validation::text(&mut errors, "description", req.description),
    };
    errors.finish()?;

    let chapter = run_db(&state, move |db| {
        let row = db.update_chapter(id, &changes)?.ok_or(ApiError::NotFound)?;
        Ok(projections::chapter_summary(db, row)?)
    })
    .await?;

    Ok(Json(chapter))
}

/// DELETE /chapters/update/{id}/: staff only, cascades to everything below.
pub async fn delete_chapter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    requester: Requester,
) -> Result<impl IntoResponse, ApiError> {
    Permission::Admin.check(&requester)?;

    if !run_db(&state, move |db| Ok(db.delete_chapter(id)?)).await? {
        return Err(ApiError::NotFound);
    }

    info!("Chapter {} deleted by {}", id, requester.username);
    Ok(StatusCode::NO_CONTENT)
}
