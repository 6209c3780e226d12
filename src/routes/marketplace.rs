//! Marketplace routes: technicians, bookings, reviews, admin verification.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::ApiError;
use crate::model::{Booking, BookingStatus, Review, Technician, TechnicianFilter, VerificationStatus};
use crate::services::booking::{self, BookingRequest};
use crate::services::catalog::{self, TechnicianDetail};
use crate::services::review::{self, ReviewRequest};
use crate::services::verification::{self, VerificationRequest};
use crate::services::{Caller, ServiceError};
use crate::state::AppState;

pub(crate) fn service_error_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Backend(inner) => super::auth::backend_error_status(inner),
    }
}

#[derive(Deserialize)]
pub struct StatusChange {
    status: BookingStatus,
}

#[derive(Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    status: Option<VerificationStatus>,
}

/// `GET /api/technicians?city=&appliance=`
pub async fn list_technicians(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<TechnicianFilter>,
) -> Result<Json<Vec<Technician>>, ApiError> {
    Ok(Json(catalog::list_technicians(&*state.market, &caller, filter).await?))
}

/// `GET /api/technicians/{id}`
pub async fn technician_detail(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<TechnicianDetail>, ApiError> {
    Ok(Json(catalog::technician_detail(&*state.market, &caller, id).await?))
}

/// `GET /api/bookings`
pub async fn list_bookings(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(booking::list_bookings(&*state.market, &caller).await?))
}

/// `POST /api/bookings`
pub async fn create_booking(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let created = booking::create_booking(&*state.market, &caller, body, OffsetDateTime::now_utc()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /api/bookings/{id}`
pub async fn update_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(booking::update_status(&*state.market, &caller, id, body.status).await?))
}

/// `POST /api/reviews`
pub async fn submit_review(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let created = review::submit_review(&*state.market, &caller, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/admin/technicians?status=`
pub async fn admin_technicians(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<AdminQuery>,
) -> Result<Json<Vec<Technician>>, ApiError> {
    Ok(Json(verification::list_for_review(&*state.market, &caller, query.status).await?))
}

/// `PUT /api/admin/technicians/{id}/verification`
pub async fn set_verification(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<VerificationRequest>,
) -> Result<Json<Technician>, ApiError> {
    Ok(Json(verification::set_verification(&*state.market, &caller, id, body).await?))
}

#[cfg(test)]
#[path = "marketplace_test.rs"]
mod tests;
