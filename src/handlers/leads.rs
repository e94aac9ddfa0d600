// src/handlers/leads.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedAdmin,
    models::lead::{Lead, LeadEvent, LeadFilter, LeadPriority, LeadStatus},
    services::lead_service::{LeadChanges, ManualLead},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LeadListQuery {
    /// Busca livre em locais, telefone e e-mail
    pub q: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub owner: Option<String>,
    /// Data de embarque exata (YYYY-MM-DD)
    pub date: Option<String>,
    pub source: Option<String>,
}

impl LeadListQuery {
    // "all" e valores fora do enum são tratados como "sem filtro".
    fn into_filter(self) -> LeadFilter {
        LeadFilter {
            q: self.q.filter(|v| !v.trim().is_empty()),
            status: self.status.as_deref().and_then(LeadStatus::try_from_raw),
            priority: self.priority.as_deref().and_then(LeadPriority::try_from_raw),
            owner: self.owner.filter(|v| !v.trim().is_empty()),
            pickup_date: self
                .date
                .as_deref()
                .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()),
            source: self.source.filter(|v| !v.trim().is_empty()),
        }
    }
}

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    params(LeadListQuery),
    responses(
        (status = 200, description = "Leads mais recentes primeiro", body = Vec<Lead>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Query(query): Query<LeadListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state.lead_service.list(&query.into_filter()).await?;

    Ok((StatusCode::OK, Json(leads)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    #[validate(length(min = 1, message = "required"))]
    pub pickup_location: String,

    #[validate(length(min = 1, message = "required"))]
    pub drop_location: String,

    #[validate(length(min = 1, message = "required"))]
    pub contact_phone: String,

    pub contact_email: Option<String>,
    pub customer_name: Option<String>,
    pub trip_type: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "2026-09-01")]
    pub pickup_date: Option<NaiveDate>,

    #[schema(value_type = Option<String>, example = "07:30:00")]
    pub pickup_time: Option<NaiveTime>,

    pub status: Option<String>,
    pub priority: Option<String>,
    pub owner_name: Option<String>,
    pub follow_up_at: Option<DateTime<Utc>>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub follow_up_notes: Option<String>,
    pub source: Option<String>,
}

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead criado", body = Lead),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let input = ManualLead {
        pickup_location: payload.pickup_location,
        drop_location: payload.drop_location,
        contact_phone: payload.contact_phone,
        contact_email: payload.contact_email,
        customer_name: payload.customer_name,
        trip_type: payload.trip_type,
        pickup_date: payload.pickup_date,
        pickup_time: payload.pickup_time,
        status: payload.status,
        priority: payload.priority,
        owner_name: payload.owner_name,
        follow_up_at: payload.follow_up_at,
        reminder_at: payload.reminder_at,
        follow_up_notes: payload.follow_up_notes,
        source: payload.source,
    };

    let lead = app_state.lead_service.create(input, &admin.username).await?;

    Ok((StatusCode::CREATED, Json(lead)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadPayload {
    pub status: Option<String>,
    pub follow_up_at: Option<DateTime<Utc>>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub owner_name: Option<String>,
    pub priority: Option<String>,
    pub contact_email: Option<String>,
    pub new_note: Option<String>,

    /// "confirm", "reschedule" ou "contacted"
    pub quick_action: Option<String>,
}

// PATCH /api/leads/{id}
#[utoipa::path(
    patch,
    path = "/api/leads/{id}",
    tag = "Leads",
    request_body = UpdateLeadPayload,
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead atualizado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    let changes = LeadChanges {
        status: payload.status,
        follow_up_at: payload.follow_up_at,
        reminder_at: payload.reminder_at,
        owner_name: payload.owner_name,
        priority: payload.priority,
        contact_email: payload.contact_email,
        new_note: payload.new_note,
        quick_action: payload.quick_action,
    };

    let lead = app_state
        .lead_service
        .update(id, changes, &admin.username)
        .await?;

    Ok((StatusCode::OK, Json(lead)))
}

// GET /api/leads/{id}/events
#[utoipa::path(
    get,
    path = "/api/leads/{id}/events",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Histórico do lead, mais recente primeiro", body = Vec<LeadEvent>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_lead_events(
    State(app_state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let events = app_state.lead_service.events_for(id).await?;

    Ok((StatusCode::OK, Json(events)))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ExportQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
}

// GET /api/leads/export.csv
#[utoipa::path(
    get,
    path = "/api/leads/export.csv",
    tag = "Leads",
    params(ExportQuery),
    responses(
        (status = 200, description = "Planilha CSV dos leads filtrados"),
        (status = 404, description = "Nenhum lead para exportar")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_leads(
    State(app_state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = LeadFilter {
        status: query.status.as_deref().and_then(LeadStatus::try_from_raw),
        priority: query.priority.as_deref().and_then(LeadPriority::try_from_raw),
        ..LeadFilter::default()
    };

    let Some(csv_bytes) = app_state.lead_service.export_csv(&filter).await? else {
        return Ok((StatusCode::NOT_FOUND, "No leads to export").into_response());
    };

    let filename = format!("leads-export-{}.csv", Utc::now().format("%Y-%m-%d"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv_bytes,
    )
        .into_response())
}
