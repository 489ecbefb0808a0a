//! Auth Router

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use directory::UserDirectory;
use platform::rate_limit::RateLimitStore;
use std::sync::Arc;

use crate::application::AuthGateway;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::require_session;

/// Create the Auth router for any directory and limiter implementation
///
/// `/register` and `/login` are public; the rest require a bearer token.
pub fn auth_router_generic<D, L>(gateway: Arc<AuthGateway<D, L>>) -> Router
where
    D: UserDirectory + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let tokens = gateway.tokens().clone();
    let state = AuthAppState { gateway };

    let protected = Router::new()
        .route("/me", get(handlers::me::<D, L>))
        .route("/profile", put(handlers::update_profile::<D, L>))
        .route("/change-password", put(handlers::change_password::<D, L>))
        .route_layer(middleware::from_fn_with_state(tokens, require_session));

    Router::new()
        .route("/register", post(handlers::register::<D, L>))
        .route("/login", post(handlers::login::<D, L>))
        .merge(protected)
        .with_state(state)
}
