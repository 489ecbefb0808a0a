//! Location Routers
//!
//! Presence routes read `SessionIdentity` from request extensions; the
//! caller layers session verification over [`presence_router_generic`].

use axum::{
    Router,
    routing::{get, patch, post},
};
use std::sync::Arc;

use crate::domain::repository::LocationDirectory;
use crate::presentation::handlers::{self, LocationAppState};

/// Public location routes: list, add, update
pub fn location_router_generic<D>(directory: Arc<D>) -> Router
where
    D: LocationDirectory + Clone + Send + Sync + 'static,
{
    let state = LocationAppState { directory };

    Router::new()
        .route(
            "/",
            get(handlers::list_locations::<D>).post(handlers::add_location::<D>),
        )
        .route("/{id}", patch(handlers::update_location::<D>))
        .with_state(state)
}

/// Check-in / check-out routes
pub fn presence_router_generic<D>(directory: Arc<D>) -> Router
where
    D: LocationDirectory + Clone + Send + Sync + 'static,
{
    let state = LocationAppState { directory };

    Router::new()
        .route("/{id}/checkin", post(handlers::check_in::<D>))
        .route("/checkout", post(handlers::check_out::<D>))
        .with_state(state)
}
