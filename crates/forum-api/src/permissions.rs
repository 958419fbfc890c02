use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// The authenticated account behind a request, resolved by
/// [`crate::middleware::authenticate`].
///
/// Taking a `Requester` argument is the "is authenticated" check: extraction
/// fails with 401 for anonymous requests.
#[derive(Debug, Clone)]
pub struct Requester {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Requester>()
            .cloned()
            .ok_or(ApiError::NotAuthenticated)
    }
}

/// Per-endpoint predicates applied on top of authentication.
#[derive(Debug, Clone, Copy)]
pub enum Permission {
    Admin,
    OwnerOrAdmin { owner_id: i64 },
}

impl Permission {
    pub fn allows(self, requester: &Requester) -> bool {
        match self {
            Self::Admin => requester.is_staff,
            Self::OwnerOrAdmin { owner_id } => requester.is_staff || requester.id == owner_id,
        }
    }

    pub fn check(self, requester: &Requester) -> Result<(), ApiError> {
        if self.allows(requester) { Ok(()) } else { Err(ApiError::PermissionDenied) }
    }
}
