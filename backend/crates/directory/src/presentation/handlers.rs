//! HTTP Handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use kernel::session::SessionIdentity;
use std::sync::Arc;

use crate::application::{CheckInInput, CheckInUseCase, CheckOutUseCase};
use crate::domain::location::{Location, LocationPatch};
use crate::domain::repository::LocationDirectory;
use crate::error::{DirectoryError, DirectoryResult};
use crate::presentation::dto::{CheckInRequest, CheckOutResponse, NewLocationRequest};

/// Shared state for location handlers
#[derive(Clone)]
pub struct LocationAppState<D>
where
    D: LocationDirectory + Clone + Send + Sync + 'static,
{
    pub directory: Arc<D>,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> DirectoryResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected location request body");
        DirectoryError::Validation("Invalid request body".to_string())
    })
}

// ============================================================================
// Locations
// ============================================================================

/// GET /api/locations
pub async fn list_locations<D>(
    State(state): State<LocationAppState<D>>,
) -> DirectoryResult<Json<Vec<Location>>>
where
    D: LocationDirectory + Clone + Send + Sync + 'static,
{
    Ok(Json(state.directory.list_locations().await?))
}

/// POST /api/locations
pub async fn add_location<D>(
    State(state): State<LocationAppState<D>>,
    body: Result<Json<NewLocationRequest>, JsonRejection>,
) -> DirectoryResult<(StatusCode, Json<Location>)>
where
    D: LocationDirectory + Clone + Send + Sync + 'static,
{
    let req = json_body(body)?;
    let location = state.directory.add_location(req.into()).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// PATCH /api/locations/{id}
pub async fn update_location<D>(
    State(state): State<LocationAppState<D>>,
    Path(id): Path<String>,
    body: Result<Json<LocationPatch>, JsonRejection>,
) -> DirectoryResult<Json<Location>>
where
    D: LocationDirectory + Clone + Send + Sync + 'static,
{
    let patch = json_body(body)?;
    state
        .directory
        .update_location(&id, patch)
        .await?
        .map(Json)
        .ok_or(DirectoryError::LocationNotFound)
}

// ============================================================================
// Presence (requires session)
// ============================================================================

/// POST /api/locations/{id}/checkin
pub async fn check_in<D>(
    State(state): State<LocationAppState<D>>,
    Path(id): Path<String>,
    Extension(session): Extension<SessionIdentity>,
    body: Result<Json<CheckInRequest>, JsonRejection>,
) -> DirectoryResult<Json<Location>>
where
    D: LocationDirectory + Clone + Send + Sync + 'static,
{
    let req = json_body(body)?;
    let use_case = CheckInUseCase::new(state.directory.clone());

    let location = use_case
        .execute(
            &session,
            CheckInInput {
                location_id: id,
                intent: req.intent,
            },
        )
        .await?;

    Ok(Json(location))
}

/// POST /api/locations/checkout
pub async fn check_out<D>(
    State(state): State<LocationAppState<D>>,
    Extension(session): Extension<SessionIdentity>,
) -> DirectoryResult<Json<CheckOutResponse>>
where
    D: LocationDirectory + Clone + Send + Sync + 'static,
{
    let use_case = CheckOutUseCase::new(state.directory.clone());
    let output = use_case.execute(&session).await?;

    Ok(Json(CheckOutResponse {
        locations_left: output.left,
    }))
}
