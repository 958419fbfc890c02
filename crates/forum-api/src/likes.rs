use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use forum_types::api::LikePayload;
use forum_types::models::Like;

use crate::auth::AppState;
use crate::error::{ApiError, FieldErrors};
use crate::permissions::{Permission, Requester};
use crate::{projections, run_db, validation};

/// GET /messages/{id}/likes/: every relation on the message, liked or not.
pub async fn list_likes(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let likes: Vec<Like> = run_db(&state, move |db| {
        if db.get_message(message_id)?.is_none() {
            return Err(ApiError::NotFound);
        }
        Ok(db.likes_for_message(message_id)?)
    })
    .await?
    .into_iter()
    .map(projections::like_view)
    .collect();
    Ok(Json(likes))
}

/// POST /likes/create/: any authenticated user. Repeated likes from the same
/// user are stored as separate rows.
pub async fn create_like(
    State(state): State<AppState>,
    requester: Requester,
    payload: Result<Json<LikePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let mut errors = FieldErrors::default();
    let message = validation::required_pk(&mut errors, "message", req.message);
    let like = validation::boolean(&mut errors, "like", req.like).unwrap_or(false);
    let Some(message) = message else {
        return Err(errors.into());
    };
    errors.finish()?;

    let user = requester.id;
    let row = run_db(&state, move |db| {
        if db.get_message(message)?.is_none() {
            return Err(FieldErrors::single("message", validation::missing_object(message)).into());
        }
        Ok(db.insert_like(user, message, like)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(projections::like_view(row))))
}

/// PATCH /likes/update/{id}/: owner or staff.
pub async fn update_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    requester: Requester,
    payload: Result<Json<LikePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let current = run_db(&state, move |db| db.get_like(id)?.ok_or(ApiError::NotFound)).await?;
    Permission::OwnerOrAdmin { owner_id: current.user_id }.check(&requester)?;

    let Json(req) = payload?;
    let mut errors = FieldErrors::default();
    let like = validation::boolean(&mut errors, "like", req.like);
    errors.finish()?;
    let Some(like) = like else {
        return Ok(Json(projections::like_view(current)));
    };

    let row = run_db(&state, move |db| db.update_like(id, like)?.ok_or(ApiError::NotFound)).await?;
    Ok(Json(projections::like_view(row)))
}
