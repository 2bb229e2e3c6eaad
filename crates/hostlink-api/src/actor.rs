//! The calling user, as asserted by the auth layer in front of this router.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated user's id.
pub const USER_HEADER: &str = "x-user-id";

/// Extracts the caller's user id from [`USER_HEADER`]. Missing or malformed
/// ids are rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub Uuid);

impl<S> FromRequestParts<S> for Actor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let raw = parts
      .headers
      .get(USER_HEADER)
      .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_HEADER} header")))?;
    raw
      .to_str()
      .ok()
      .and_then(|s| Uuid::parse_str(s.trim()).ok())
      .map(Actor)
      .ok_or_else(|| ApiError::Unauthorized(format!("malformed {USER_HEADER} header")))
  }
}
