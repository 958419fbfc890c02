use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use forum_db::models::{ThemeChanges, ThemeFilter};
use forum_db::{Database, ListOrder};
use forum_types::api::ThemePayload;

use crate::auth::AppState;
use crate::error::{ApiError, FieldErrors};
use crate::pagination::PageParams;
use crate::permissions::{Permission, Requester};
use crate::validation::{self, NAME_MAX_CHARS};
use crate::{projections, run_db};

#[derive(Debug, Deserialize)]
pub struct ThemeQuery {
    pub category: Option<String>,
    pub user: Option<String>,
    pub status: Option<String>,
    pub ordering: Option<String>,
}

impl ThemeQuery {
    fn parse(&self) -> Result<(ThemeFilter, ListOrder), ApiError> {
        let mut errors = FieldErrors::default();
        let filter = ThemeFilter {
            category_id: validation::id_filter(&mut errors, "category", self.category.as_deref()),
            user_id: validation::id_filter(&mut errors, "user", self.user.as_deref()),
            status: validation::bool_filter(&mut errors, "status", self.status.as_deref()),
        };
        errors.finish()?;

        // Unknown orderings fall back to oldest first; themes have no updated_at.
        let order = self
            .ordering
            .as_deref()
            .and_then(ListOrder::parse)
            .filter(|order| !order.uses_updated_at())
            .unwrap_or_default();

        Ok((filter, order))
    }
}

/// GET /themes/?category=&user=&status=&ordering=&page=
pub async fn list_themes(
    State(state): State<AppState>,
    Query(query): Query<ThemeQuery>,
    Query(paging): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, order) = query.parse()?;

    let page = run_db(&state, move |db| {
        let count = db.count_themes(&filter)?;
        let window = paging.window(count)?;
        let rows = db.list_themes(&filter, order, window.limit(), window.offset())?;
        Ok(window.into_page(count, projections::theme_summaries(db, rows)?))
    })
    .await?;
    Ok(Json(page))
}

/// GET /themes/{id}/: messages embedded, with a count.
pub async fn get_theme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let theme = run_db(&state, move |db| {
        let row = db.get_theme(id)?.ok_or(ApiError::NotFound)?;
        Ok(projections::theme_detail(db, row)?)
    })
    .await?;
    Ok(Json(theme))
}

/// POST /themes/create/: any authenticated user; they become the owner.
pub async fn create_theme(
    State(state): State<AppState>,
    requester: Requester,
    payload: Result<Json<ThemePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let mut errors = FieldErrors::default();
    let category = validation::required_pk(&mut errors, "category", req.category);
    let name = validation::required_text(&mut errors, "name", req.name, Some(NAME_MAX_CHARS));
    let status = validation::boolean(&mut errors, "status", req.status).unwrap_or(true);
    let (Some(category), Some(name)) = (category, name) else {
        return Err(errors.into());
    };
    errors.finish()?;

    let owner = requester.id;
    let theme = run_db(&state, move |db| {
        ensure_category(db, category)?;
        Ok(db.insert_theme(category, &name, status, owner)?)
    })
    .await?;

    info!("Theme {} created by {}", theme.id, requester.username);
    Ok((StatusCode::CREATED, Json(projections::theme_record(theme))))
}

/// PATCH /themes/update/{id}/: owner or staff. Opening and closing a theme
/// is an ordinary `status` update.
pub async fn update_theme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    requester: Requester,
    payload: Result<Json<ThemePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id = run_db(&state, move |db| Ok(db.get_theme(id)?.ok_or(ApiError::NotFound)?.user_id)).await?;
    Permission::OwnerOrAdmin { owner_id }.check(&requester)?;

    let Json(req) = payload?;
    let mut errors = FieldErrors::default();
    let changes = ThemeChanges {
        category_id: validation::pk(&mut errors, "category", req.category),
        name: validation::optional_text(&mut errors, "name", req.name, Some(NAME_MAX_CHARS)),
        status: validation::boolean(&mut errors, "status", req.status),
    };
    errors.finish()?;

    let theme = run_db(&state, move |db| {
        if let Some(category) = changes.category_id {
            ensure_category(db, category)?;
        }
        db.update_theme(id, &changes)?.ok_or(ApiError::NotFound)
    })
    .await?;

    Ok(Json(projections::theme_record(theme)))
}

/// DELETE /themes/delete/{id}/: staff only.
pub async fn delete_theme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    requester: Requester,
) -> Result<impl IntoResponse, ApiError> {
    Permission::Admin.check(&requester)?;

    if !run_db(&state, move |db| Ok(db.delete_theme(id)?)).await? {
        return Err(ApiError::NotFound);
    }

    info!("Theme {} deleted by {}", id, requester.username);
    Ok(StatusCode::NO_CONTENT)
}

fn ensure_category(db: &Database, category: i64) -> Result<(), ApiError> {
    if db.get_category(category)?.is_none() {
        return Err(FieldErrors::single("category", validation::missing_object(category)).into());
    }
    Ok(())
}
