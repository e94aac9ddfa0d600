// src/handlers/bookings.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    services::booking_service::BookingRequest,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Siliguri Junction")]
    pub pickup: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Bagdogra Airport")]
    pub drop: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "9876543210")]
    pub phone: String,

    #[schema(example = "airport")]
    pub trip_type: Option<String>,

    #[schema(example = "2026-09-01")]
    pub date: Option<String>,

    #[schema(example = "07:30")]
    pub time: Option<String>,

    #[schema(example = "homepage")]
    pub source: Option<String>,
}

// POST /api/bookings
#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "Bookings",
    request_body = CreateBookingPayload,
    responses(
        (status = 201, description = "Lead criado"),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn create_booking(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateBookingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let header_value =
        |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);

    let request = BookingRequest {
        pickup: payload.pickup,
        drop: payload.drop,
        phone: payload.phone,
        trip_type: payload.trip_type,
        date: payload.date,
        time: payload.time,
        source: payload.source,
        referrer: header_value(header::REFERER),
        user_agent: header_value(header::USER_AGENT),
    };

    let lead = app_state.booking_service.create_booking(request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "id": lead.id }))))
}

// GET /api/public-config
#[utoipa::path(
    get,
    path = "/api/public-config",
    tag = "Bookings",
    responses(
        (status = 200, description = "Configuração pública do site")
    )
)]
pub async fn public_config(State(app_state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(json!({ "googleMapsKey": app_state.google_maps_key })),
    )
}
