// src/handlers/reminders.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{config::AppState, services::reminder_service::DispatchSummary};

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchResponse {
    pub ok: bool,
    pub processed: u32,
    pub sent: u32,
    pub failed: u32,
    pub pending: u32,
}

impl From<DispatchSummary> for DispatchResponse {
    fn from(summary: DispatchSummary) -> Self {
        Self {
            ok: true,
            processed: summary.processed,
            sent: summary.sent,
            failed: summary.failed,
            pending: summary.pending,
        }
    }
}

// GET|POST /api/reminders/run
//
// Gatilho do dispatcher, pensado para um agendador externo (cron). Se
// REMINDER_CRON_SECRET estiver definido, o chamador precisa apresentá-lo
// antes de qualquer acesso a dados.
#[utoipa::path(
    post,
    path = "/api/reminders/run",
    tag = "Reminders",
    responses(
        (status = 200, description = "Contagens da rodada", body = DispatchResponse),
        (status = 401, description = "Segredo ausente ou incorreto"),
        (status = 500, description = "Falha na consulta de seleção")
    )
)]
pub async fn run(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(secret) = &app_state.reminder_secret {
        if !is_authorized(&headers, secret) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "ok": false, "error": "unauthorized" })),
            )
                .into_response();
        }
    }

    match app_state.reminder_service.run().await {
        Ok(summary) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store")],
            Json(DispatchResponse::from(summary)),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Rodada de lembretes abortada: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// Aceita o segredo num header dedicado ou como bearer token.
fn is_authorized(headers: &HeaderMap, secret: &str) -> bool {
    let raw = headers
        .get("x-reminder-secret")
        .or_else(|| headers.get(header::AUTHORIZATION))
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

    !token.is_empty() && token == secret
}
