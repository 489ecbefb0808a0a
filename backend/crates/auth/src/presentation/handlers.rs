//! HTTP Handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, IntoResponseParts, Response, ResponseParts};
use directory::UserDirectory;
use kernel::session::SessionIdentity;
use platform::client::client_identifier;
use platform::rate_limit::{RateLimitResult, RateLimitStore};
use serde::Serialize;

use crate::application::{AuthGateway, GatewayOutcome};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MeResponse, MessageResponse,
    RegisterRequest, UpdateProfileRequest,
};

/// Shared state for auth handlers
pub struct AuthAppState<D, L> {
    pub gateway: Arc<AuthGateway<D, L>>,
}

impl<D, L> Clone for AuthAppState<D, L> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
        }
    }
}

/// `X-RateLimit-*` headers describing the caller's window
pub struct RateLimitHeaders(pub RateLimitResult);

impl IntoResponseParts for RateLimitHeaders {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let headers = res.headers_mut();
        headers.insert(
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderValue::from(self.0.limit),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from(self.0.remaining),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-reset"),
            HeaderValue::from(self.0.reset_at_ms),
        );
        Ok(res)
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AuthResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected auth request body");
        AuthError::Validation("Invalid request body".to_string())
    })
}

fn respond<T: Serialize>(outcome: GatewayOutcome<T>, success: StatusCode) -> Response {
    let headers = outcome.rate.map(RateLimitHeaders);
    match outcome.result {
        Ok(body) => (headers, (success, Json(body))).into_response(),
        Err(e) => (headers, e).into_response(),
    }
}

// ============================================================================
// Register / Login
// ============================================================================

/// POST /api/auth/register
pub async fn register<D, L>(
    State(state): State<AuthAppState<D, L>>,
    headers: HeaderMap,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response
where
    D: UserDirectory + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let client = client_identifier(&headers);
    let input = json_body(body).map(Into::into);

    let outcome = state.gateway.register(&client, input).await;
    respond(
        outcome.map(|auth| AuthResponse::new("User created successfully", auth)),
        StatusCode::CREATED,
    )
}

/// POST /api/auth/login
pub async fn login<D, L>(
    State(state): State<AuthAppState<D, L>>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response
where
    D: UserDirectory + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let client = client_identifier(&headers);
    let input = json_body(body).map(Into::into);

    let outcome = state.gateway.login(&client, input).await;
    respond(
        outcome.map(|auth| AuthResponse::new("Login successful", auth)),
        StatusCode::OK,
    )
}

// ============================================================================
// Session (requires session)
// ============================================================================

/// GET /api/auth/me
pub async fn me<D, L>(
    State(state): State<AuthAppState<D, L>>,
    Extension(session): Extension<SessionIdentity>,
    headers: HeaderMap,
) -> Response
where
    D: UserDirectory + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let client = client_identifier(&headers);
    let result = state
        .gateway
        .current_user(&session)
        .await
        .map(|user| Json(MeResponse { user: user.into() }));

    let rate = state.gateway.rate_status(&client).await;
    (rate.map(RateLimitHeaders), result).into_response()
}

/// PUT /api/auth/profile
pub async fn update_profile<D, L>(
    State(state): State<AuthAppState<D, L>>,
    Extension(session): Extension<SessionIdentity>,
    headers: HeaderMap,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Response
where
    D: UserDirectory + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let client = client_identifier(&headers);
    let result = match json_body(body) {
        Ok(input) => state
            .gateway
            .update_profile(&client, &session, input.into())
            .await
            .map(|auth| Json(AuthResponse::new("Profile updated successfully", auth))),
        Err(e) => Err(e),
    };

    let rate = state.gateway.rate_status(&client).await;
    (rate.map(RateLimitHeaders), result).into_response()
}

/// PUT /api/auth/change-password
pub async fn change_password<D, L>(
    State(state): State<AuthAppState<D, L>>,
    Extension(session): Extension<SessionIdentity>,
    headers: HeaderMap,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Response
where
    D: UserDirectory + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let client = client_identifier(&headers);
    let input = json_body(body).map(Into::into);

    let outcome = state.gateway.change_password(&client, &session, input).await;
    respond(
        outcome.map(|()| MessageResponse {
            message: "Password updated successfully",
        }),
        StatusCode::OK,
    )
}
