use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use forum_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::permissions::Requester;
use crate::run_db;

/// Resolves an `Authorization: Bearer` token to the current user.
///
/// No header: the request continues anonymously. A bad or expired token, a
/// logged-out one, or one whose user no longer exists, is rejected with 401 on
/// any route.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() else {
        return Ok(next.run(req).await);
    };

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        ApiError::InvalidToken
    })?;

    let Claims { sub: user_id, ver, .. } = token_data.claims;
    let user = run_db(&state, move |db| Ok(db.get_user_by_id(user_id)?))
        .await?
        .ok_or_else(|| {
            warn!("Token for deleted user {}", user_id);
            ApiError::InvalidToken
        })?;
    if user.token_version != ver {
        warn!("Revoked token for user {}", user_id);
        return Err(ApiError::InvalidToken);
    }

    req.extensions_mut().insert(Requester {
        id: user.id,
        username: user.username,
        is_staff: user.is_staff,
    });
    Ok(next.run(req).await)
}
