// src/docs.rs

use axum::Json;
use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Bookings (público) ---
        handlers::bookings::create_booking,
        handlers::bookings::public_config,

        // --- Leads (painel) ---
        handlers::leads::list_leads,
        handlers::leads::create_lead,
        handlers::leads::update_lead,
        handlers::leads::list_lead_events,
        handlers::leads::export_leads,

        // --- Reminders ---
        handlers::reminders::run,
    ),
    components(
        schemas(
            handlers::auth::LoginPayload,
            handlers::bookings::CreateBookingPayload,
            handlers::leads::CreateLeadPayload,
            handlers::leads::UpdateLeadPayload,
            handlers::reminders::DispatchResponse,
            models::auth::LoginResponse,
            models::lead::Lead,
            models::lead::LeadEvent,
            models::lead::LeadStatus,
            models::lead::LeadPriority,
            models::lead::TripType,
            models::lead::ReminderStatus,
            services::reminder_service::DispatchSummary,
        )
    ),
    tags(
        (name = "Auth", description = "Login do painel"),
        (name = "Bookings", description = "Intake público de reservas"),
        (name = "Leads", description = "Gestão de leads do painel"),
        (name = "Reminders", description = "Dispatcher de lembretes de viagem")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

// GET /api/docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
