//! Auth Middleware
//!
//! Bearer-token check for protected routes. On success the verified
//! `SessionIdentity` is placed in the request extensions.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::application::TokenService;
use crate::error::AuthError;

/// Token after `Bearer ` in the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware that requires a valid session token
///
/// Use with `axum::middleware::from_fn_with_state(tokens, require_session)`.
pub async fn require_session(
    State(tokens): State<TokenService>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).ok_or(AuthError::Unauthorized)?;
    let claims = tokens.verify(token)?;

    req.extensions_mut().insert(claims.identity());
    Ok(next.run(req).await)
}
