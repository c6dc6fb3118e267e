//! Trip endpoints.
//!
//! Flow Overview:
//! 1) Authenticate the request via Basic credentials.
//! 2) Run the operation on the `trips` collection scoped to the caller.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use super::{
    auth::{require_auth, AuthGate},
    owned::OwnedCollection,
    ApiError,
};
use crate::store::RecordStore;

pub const TRIPS: OwnedCollection = OwnedCollection::new("trips");

/// Shape of a stored trip; any extra client fields are returned alongside.
#[derive(Debug, Serialize, ToSchema)]
pub struct Trip {
    pub id: String,
    pub owner: String,
    pub name: Option<String>,
}

/// Request body for creating or replacing a trip.
///
/// Any JSON object is accepted and stored as given, except `id` and `owner`,
/// which the server assigns.
#[derive(Debug, ToSchema)]
#[schema(example = json!({"name": "Paris", "nights": 3}))]
pub struct TripInput {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TripDeleted {
    pub id: String,
}

#[utoipa::path(
    get,
    path = "/trip/",
    responses(
        (status = 200, description = "Trips owned by the caller, oldest first.", body = [Trip]),
        (status = 401, description = "Missing or invalid credentials."),
    ),
    security(("basic_auth" = [])),
    tag = "trips"
)]
pub async fn list_trips(
    headers: HeaderMap,
    Extension(gate): Extension<Arc<AuthGate>>,
    Extension(records): Extension<Arc<dyn RecordStore>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &gate).await?;
    let trips = TRIPS.list(records.as_ref(), &principal).await?;
    Ok(Json(trips))
}

#[utoipa::path(
    get,
    path = "/trip/{id}",
    params(
        ("id" = String, Path, description = "Trip id")
    ),
    responses(
        (status = 200, description = "The trip.", body = Trip),
        (status = 401, description = "Missing or invalid credentials."),
        (status = 404, description = "No such trip for this user."),
    ),
    security(("basic_auth" = [])),
    tag = "trips"
)]
pub async fn get_trip(
    Path(id): Path<String>,
    headers: HeaderMap,
    Extension(gate): Extension<Arc<AuthGate>>,
    Extension(records): Extension<Arc<dyn RecordStore>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &gate).await?;
    let trip = TRIPS.get(records.as_ref(), &principal, &id).await?;
    Ok(Json(trip))
}

#[utoipa::path(
    post,
    path = "/trip/",
    request_body = TripInput,
    responses(
        (status = 201, description = "Trip created; owner is the caller.", body = Trip),
        (status = 400, description = "Body is not a JSON object or contains NUL characters."),
        (status = 401, description = "Missing or invalid credentials."),
    ),
    security(("basic_auth" = [])),
    tag = "trips"
)]
pub async fn create_trip(
    headers: HeaderMap,
    Extension(gate): Extension<Arc<AuthGate>>,
    Extension(records): Extension<Arc<dyn RecordStore>>,
    payload: Option<Json<Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &gate).await?;
    let body = payload.map_or(Value::Null, |Json(body)| body);
    let trip = TRIPS.create(records.as_ref(), &principal, body).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

#[utoipa::path(
    put,
    path = "/trip/{id}",
    params(
        ("id" = String, Path, description = "Trip id")
    ),
    request_body = TripInput,
    responses(
        (status = 200, description = "Trip fields replaced.", body = Trip),
        (status = 400, description = "Body is not a JSON object or contains NUL characters."),
        (status = 401, description = "Missing or invalid credentials."),
        (status = 404, description = "No such trip for this user."),
    ),
    security(("basic_auth" = [])),
    tag = "trips"
)]
pub async fn update_trip(
    Path(id): Path<String>,
    headers: HeaderMap,
    Extension(gate): Extension<Arc<AuthGate>>,
    Extension(records): Extension<Arc<dyn RecordStore>>,
    payload: Option<Json<Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &gate).await?;
    let body = payload.map_or(Value::Null, |Json(body)| body);
    let trip = TRIPS.update(records.as_ref(), &principal, &id, body).await?;
    Ok(Json(trip))
}

#[utoipa::path(
    delete,
    path = "/trip/{id}",
    params(
        ("id" = String, Path, description = "Trip id")
    ),
    responses(
        (status = 200, description = "Acknowledged, whether or not anything was deleted.", body = TripDeleted),
        (status = 401, description = "Missing or invalid credentials."),
    ),
    security(("basic_auth" = [])),
    tag = "trips"
)]
pub async fn delete_trip(
    Path(id): Path<String>,
    headers: HeaderMap,
    Extension(gate): Extension<Arc<AuthGate>>,
    Extension(records): Extension<Arc<dyn RecordStore>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &gate).await?;
    let ack = TRIPS.delete(records.as_ref(), &principal, &id).await?;
    Ok(Json(ack))
}
