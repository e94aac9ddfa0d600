// src/models/lead.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE lead_status do banco
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "lead_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Followup,
    Confirmed,
    Cancelled,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Followup => "followup",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn try_from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "new" => Some(Self::New),
            "followup" => Some(Self::Followup),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    // O painel admin sempre envia um valor; qualquer coisa fora da lista
    // vira "new" em vez de rejeitar a requisição.
    pub fn from_raw(raw: &str) -> Self {
        Self::try_from_raw(raw).unwrap_or(Self::New)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "lead_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeadPriority {
    Hot,
    Warm,
    Cold,
}

impl LeadPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }

    pub fn try_from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "hot" => Some(Self::Hot),
            "warm" => Some(Self::Warm),
            "cold" => Some(Self::Cold),
            _ => None,
        }
    }

    pub fn from_raw(raw: &str) -> Self {
        Self::try_from_raw(raw).unwrap_or(Self::Warm)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "trip_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TripType {
    OneWay,
    RoundTrip,
    Airport,
}

impl TripType {
    pub fn try_from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "one-way" => Some(Self::OneWay),
            "round-trip" => Some(Self::RoundTrip),
            "airport" => Some(Self::Airport),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OneWay => "One Way",
            Self::RoundTrip => "Round Trip",
            Self::Airport => "Airport",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "reminder_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Failed,
}

// --- LEAD ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,

    // Dados da viagem
    pub pickup_location: String,
    pub drop_location: String,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_time: Option<NaiveTime>,
    pub trip_type: Option<TripType>,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub customer_name: Option<String>,

    // Proveniência
    pub source: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,

    // Workflow
    pub status: LeadStatus,
    pub priority: LeadPriority,
    pub owner_name: Option<String>,
    pub follow_up_at: Option<DateTime<Utc>>,
    pub follow_up_notes: Option<String>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub call_count: i32,

    // Lembrete
    pub reminder_at: Option<DateTime<Utc>>,
    pub reminder_status: Option<ReminderStatus>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub reminder_error: Option<String>,
}

// Dados para a criação de um lead (site ou painel admin)
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub pickup_location: String,
    pub drop_location: String,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_time: Option<NaiveTime>,
    pub trip_type: Option<TripType>,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub customer_name: Option<String>,
    pub source: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub status: Option<LeadStatus>,
    pub priority: Option<LeadPriority>,
    pub owner_name: Option<String>,
    pub follow_up_at: Option<DateTime<Utc>>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub follow_up_notes: Option<String>,
}

// Filtros da listagem do painel (e da exportação CSV)
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub q: Option<String>,
    pub status: Option<LeadStatus>,
    pub priority: Option<LeadPriority>,
    pub owner: Option<String>,
    pub pickup_date: Option<NaiveDate>,
    pub source: Option<String>,
}

// Novo estado calculado por um update do painel. Quando `reminder_reset`
// está ligado, o lembrete é re-armado: status volta a pending (ou NULL se o
// horário foi limpo) e sent_at/error são zerados.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadUpdate {
    pub status: LeadStatus,
    pub follow_up_at: Option<DateTime<Utc>>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub owner_name: Option<String>,
    pub priority: LeadPriority,
    pub contact_email: Option<String>,
    pub follow_up_notes: Option<String>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub reminder_reset: bool,
}

// Resultado de uma rodada do dispatcher para um lead específico
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderStateUpdate {
    pub status: ReminderStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub last_contacted_at: Option<DateTime<Utc>>,
}

// Projeção usada pela seleção de lembretes vencidos
#[derive(Debug, Clone, FromRow)]
pub struct DueReminder {
    pub id: Uuid,
    pub pickup_location: String,
    pub drop_location: String,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_time: Option<NaiveTime>,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub reminder_status: Option<ReminderStatus>,
}

// --- EVENTOS (histórico append-only) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadEvent {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub event_type: String,
    pub message: Option<String>,
    pub meta: Option<Value>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLeadEvent {
    pub event_type: String,
    pub message: Option<String>,
    pub meta: Option<Value>,
    pub created_by: Option<String>,
}

impl NewLeadEvent {
    pub fn new(event_type: &str, message: &str) -> Self {
        Self {
            event_type: event_type.to_owned(),
            message: Some(message.to_owned()),
            meta: None,
            created_by: None,
        }
    }

    pub fn by(mut self, actor: &str) -> Self {
        self.created_by = Some(actor.to_owned());
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}
