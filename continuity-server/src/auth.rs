//! Caller identity as asserted by the upstream auth gateway.
//!
//! No authentication happens here. The gateway sets `X-Author-Id`; this
//! extractor only parses it and checks it against ids in request bodies.

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use continuity_core::AuthorId;

pub const AUTHOR_HEADER: &str = "x-author-id";

/// The author making a write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorIdentity(pub AuthorId);

impl AuthorIdentity {
    /// Reject a body that claims to act for a different author.
    pub fn ensure(&self, claimed: AuthorId) -> Result<(), ApiError> {
        if claimed == self.0 {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "authorId {claimed} does not match the authenticated author"
            )))
        }
    }
}

impl<S> FromRequestParts<S> for AuthorIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(AUTHOR_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing X-Author-Id header".to_string()))?;
        let raw = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("X-Author-Id is not valid text".to_string()))?;
        raw.trim()
            .parse()
            .map(AuthorIdentity)
            .map_err(|_| ApiError::Unauthorized(format!("X-Author-Id {raw:?} is not an author id")))
    }
}
