// src/services/lead_service.rs

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EventRepository, LeadRepository},
    models::lead::{
        Lead, LeadEvent, LeadFilter, LeadPriority, LeadStatus, LeadUpdate, NewLead, NewLeadEvent,
    },
};

/// Entrada crua de um update do painel. Os campos representam o estado
/// completo desejado (o formulário sempre envia tudo), não um diff.
#[derive(Debug, Clone, Default)]
pub struct LeadChanges {
    pub status: Option<String>,
    pub follow_up_at: Option<DateTime<Utc>>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub owner_name: Option<String>,
    pub priority: Option<String>,
    pub contact_email: Option<String>,
    pub new_note: Option<String>,
    pub quick_action: Option<String>,
}

/// Entrada crua da criação manual de lead pelo painel.
#[derive(Debug, Clone, Default)]
pub struct ManualLead {
    pub pickup_location: String,
    pub drop_location: String,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub customer_name: Option<String>,
    pub trip_type: Option<String>,
    pub pickup_date: Option<chrono::NaiveDate>,
    pub pickup_time: Option<chrono::NaiveTime>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub owner_name: Option<String>,
    pub follow_up_at: Option<DateTime<Utc>>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub follow_up_notes: Option<String>,
    pub source: Option<String>,
}

#[derive(Clone)]
pub struct LeadService {
    leads: LeadRepository,
    events: EventRepository,
}

impl LeadService {
    pub fn new(leads: LeadRepository, events: EventRepository) -> Self {
        Self { leads, events }
    }

    pub async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        self.leads.list(filter).await
    }

    pub async fn events_for(&self, lead_id: Uuid) -> Result<Vec<LeadEvent>, AppError> {
        self.events.list_for_lead(lead_id).await
    }

    /// Criação manual pelo painel. Dono default é o operador logado e a
    /// origem default é "admin".
    pub async fn create(&self, input: ManualLead, actor: &str) -> Result<Lead, AppError> {
        let pickup = input.pickup_location.trim().to_owned();
        let drop = input.drop_location.trim().to_owned();
        let phone = input.contact_phone.trim().to_owned();

        if pickup.is_empty() || drop.is_empty() || phone.is_empty() {
            return Err(AppError::MissingFields);
        }

        let owner = non_empty(input.owner_name).unwrap_or_else(|| actor.to_owned());
        let notes = non_empty(input.follow_up_notes);
        let source = non_empty(input.source).unwrap_or_else(|| "admin".to_owned());

        let new_lead = NewLead {
            pickup_location: pickup,
            drop_location: drop,
            contact_phone: phone,
            contact_email: non_empty(input.contact_email),
            customer_name: non_empty(input.customer_name),
            trip_type: input
                .trip_type
                .as_deref()
                .and_then(crate::models::lead::TripType::try_from_raw),
            pickup_date: input.pickup_date,
            pickup_time: input.pickup_time,
            status: Some(LeadStatus::from_raw(input.status.as_deref().unwrap_or("new"))),
            priority: Some(LeadPriority::from_raw(input.priority.as_deref().unwrap_or(""))),
            owner_name: Some(owner),
            follow_up_at: input.follow_up_at,
            reminder_at: input.reminder_at,
            follow_up_notes: notes.clone(),
            source: Some(source),
            referrer: None,
            user_agent: None,
        };

        let lead = self.leads.insert(&new_lead).await?;

        let mut events = vec![NewLeadEvent::new("created", "Lead created manually").by(actor)];
        if let Some(notes) = notes {
            events.push(NewLeadEvent::new("note", &notes).by(actor));
        }
        if let Err(e) = self.events.insert_many(lead.id, &events).await {
            tracing::warn!("Falha ao registrar eventos do lead {}: {}", lead.id, e);
        }

        Ok(lead)
    }

    /// Update do painel: aplica o novo estado e registra um evento de
    /// auditoria para cada campo que de fato mudou.
    pub async fn update(
        &self,
        id: Uuid,
        changes: LeadChanges,
        actor: &str,
    ) -> Result<Lead, AppError> {
        let existing = self.leads.find_by_id(id).await?.ok_or(AppError::LeadNotFound)?;

        let (update, events) = plan_lead_update(&existing, &changes, Utc::now(), actor);

        self.leads.update(id, &update).await?;

        // O histórico é melhor-esforço: o update do lead já foi persistido.
        if let Err(e) = self.events.insert_many(id, &events).await {
            tracing::warn!("Falha ao registrar eventos do lead {}: {}", id, e);
        }

        self.leads.find_by_id(id).await?.ok_or(AppError::LeadNotFound)
    }

    /// Exportação CSV do painel, no formato de planilha que a equipe usa.
    pub async fn export_csv(&self, filter: &LeadFilter) -> Result<Option<Vec<u8>>, AppError> {
        let leads = self.leads.list(filter).await?;
        if leads.is_empty() {
            return Ok(None);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "ID",
                "Customer Name",
                "Phone",
                "Email",
                "From",
                "To",
                "Trip Type",
                "Pickup Date",
                "Pickup Time",
                "Status",
                "Priority",
                "Owner",
                "Source",
                "Call Count",
                "Last Contacted",
                "Follow Up At",
                "Created At",
                "Notes",
            ])
            .map_err(|e| anyhow::anyhow!("Falha ao escrever CSV: {}", e))?;

        for lead in &leads {
            writer
                .write_record(csv_row(lead))
                .map_err(|e| anyhow::anyhow!("Falha ao escrever CSV: {}", e))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Falha ao finalizar CSV: {}", e))?;

        Ok(Some(bytes))
    }
}

fn csv_row(lead: &Lead) -> Vec<String> {
    vec![
        lead.id.to_string(),
        lead.customer_name.clone().unwrap_or_default(),
        lead.contact_phone.clone(),
        lead.contact_email.clone().unwrap_or_default(),
        lead.pickup_location.clone(),
        lead.drop_location.clone(),
        lead.trip_type.map(|t| t.label().to_owned()).unwrap_or_default(),
        lead.pickup_date.map(|d| d.to_string()).unwrap_or_default(),
        lead.pickup_time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default(),
        lead.status.as_str().to_owned(),
        lead.priority.as_str().to_owned(),
        lead.owner_name.clone().unwrap_or_default(),
        lead.source.clone().unwrap_or_default(),
        lead.call_count.to_string(),
        lead.last_contacted_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        lead.follow_up_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        lead.created_at.to_rfc3339(),
        lead.follow_up_notes
            .clone()
            .unwrap_or_default()
            .replace(['\n', '\r', ','], " "),
    ]
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// Função pura que calcula o novo estado do lead e os eventos de auditoria
/// correspondentes a um update do painel.
///
/// Ações rápidas ("confirm", "reschedule", "contacted") sobrescrevem os
/// campos enviados; mudar `reminder_at` re-arma o lembrete.
pub fn plan_lead_update(
    existing: &Lead,
    changes: &LeadChanges,
    now: DateTime<Utc>,
    actor: &str,
) -> (LeadUpdate, Vec<NewLeadEvent>) {
    let mut status = LeadStatus::from_raw(changes.status.as_deref().unwrap_or("new"));
    let mut follow_up_at = changes.follow_up_at;
    let reminder_at = changes.reminder_at;
    let owner_name = non_empty(changes.owner_name.clone());
    let priority = LeadPriority::from_raw(changes.priority.as_deref().unwrap_or(""));
    let contact_email = non_empty(changes.contact_email.clone());
    let new_note = non_empty(changes.new_note.clone());
    let mut last_contacted_at: Option<DateTime<Utc>> = None;

    match changes.quick_action.as_deref() {
        Some("confirm") => {
            status = LeadStatus::Confirmed;
            last_contacted_at = Some(now);
        }
        Some("reschedule") => {
            status = LeadStatus::Followup;
            follow_up_at = Some(now + Duration::hours(24));
        }
        Some("contacted") => {
            last_contacted_at = Some(now);
        }
        _ => {}
    }

    if new_note.is_some() {
        last_contacted_at = Some(now);
    }

    let reminder_changed = existing.reminder_at != reminder_at;

    let update = LeadUpdate {
        status,
        follow_up_at,
        reminder_at,
        owner_name: owner_name.clone(),
        priority,
        contact_email,
        follow_up_notes: new_note.clone(),
        last_contacted_at,
        reminder_reset: reminder_changed,
    };

    let mut events = Vec::new();

    if existing.status != status {
        events.push(
            NewLeadEvent::new(
                "status_changed",
                &format!("Status updated to {}", status.as_str()),
            )
            .with_meta(json!({ "from": existing.status.as_str(), "to": status.as_str() }))
            .by(actor),
        );
    }

    if existing.follow_up_at != follow_up_at {
        let message = match follow_up_at {
            Some(at) => format!("Follow-up set for {}", at.to_rfc3339()),
            None => "Follow-up cleared".to_owned(),
        };
        events.push(NewLeadEvent::new("follow_up_updated", &message).by(actor));
    }

    if reminder_changed {
        let message = match reminder_at {
            Some(at) => format!("Reminder scheduled for {}", at.to_rfc3339()),
            None => "Reminder cleared".to_owned(),
        };
        events.push(NewLeadEvent::new("reminder_updated", &message).by(actor));
    }

    if existing.owner_name != owner_name {
        let message = match &owner_name {
            Some(owner) => format!("Owner set to {owner}"),
            None => "Owner cleared".to_owned(),
        };
        events.push(NewLeadEvent::new("owner_updated", &message).by(actor));
    }

    if existing.priority != priority {
        events.push(
            NewLeadEvent::new(
                "priority_updated",
                &format!("Priority set to {}", priority.as_str()),
            )
            .by(actor),
        );
    }

    if let Some(note) = &new_note {
        events.push(NewLeadEvent::new("note", note).by(actor));
    }

    if last_contacted_at.is_some() {
        events.push(NewLeadEvent::new("contacted", "Lead contacted").by(actor));
    }

    (update, events)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::lead::ReminderStatus;

    fn existing_lead() -> Lead {
        Lead {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            pickup_location: "Siliguri".to_owned(),
            drop_location: "Darjeeling".to_owned(),
            pickup_date: None,
            pickup_time: None,
            trip_type: None,
            contact_phone: "9876543210".to_owned(),
            contact_email: None,
            customer_name: None,
            source: Some("homepage".to_owned()),
            referrer: None,
            user_agent: None,
            status: LeadStatus::New,
            priority: LeadPriority::Warm,
            owner_name: None,
            follow_up_at: None,
            follow_up_notes: None,
            last_contacted_at: None,
            call_count: 2,
            reminder_at: None,
            reminder_status: None,
            reminder_sent_at: None,
            reminder_error: None,
        }
    }

    fn event_types(events: &[NewLeadEvent]) -> Vec<&str> {
        events.iter().map(|e| e.event_type.as_str()).collect()
    }

    #[test]
    fn status_change_emits_event_with_meta() {
        let existing = existing_lead();
        let changes = LeadChanges {
            status: Some("followup".to_owned()),
            priority: Some("warm".to_owned()),
            ..LeadChanges::default()
        };
        let now = Utc::now();

        let (update, events) = plan_lead_update(&existing, &changes, now, "ana");

        assert_eq!(update.status, LeadStatus::Followup);
        assert_eq!(event_types(&events), vec!["status_changed"]);
        assert_eq!(
            events[0].meta,
            Some(json!({ "from": "new", "to": "followup" }))
        );
        assert_eq!(events[0].created_by.as_deref(), Some("ana"));
    }

    #[test]
    fn setting_a_reminder_rearms_and_logs() {
        let existing = existing_lead();
        let reminder_at = Utc.with_ymd_and_hms(2026, 9, 1, 6, 0, 0).unwrap();
        let changes = LeadChanges {
            status: Some("new".to_owned()),
            reminder_at: Some(reminder_at),
            ..LeadChanges::default()
        };

        let (update, events) = plan_lead_update(&existing, &changes, Utc::now(), "ana");

        assert!(update.reminder_reset);
        assert_eq!(update.reminder_at, Some(reminder_at));
        assert!(event_types(&events).contains(&"reminder_updated"));
    }

    #[test]
    fn unchanged_reminder_does_not_rearm() {
        let mut existing = existing_lead();
        let reminder_at = Utc.with_ymd_and_hms(2026, 9, 1, 6, 0, 0).unwrap();
        existing.reminder_at = Some(reminder_at);
        existing.reminder_status = Some(ReminderStatus::Sent);

        let changes = LeadChanges {
            status: Some("new".to_owned()),
            reminder_at: Some(reminder_at),
            ..LeadChanges::default()
        };

        let (update, events) = plan_lead_update(&existing, &changes, Utc::now(), "ana");

        assert!(!update.reminder_reset);
        assert!(!event_types(&events).contains(&"reminder_updated"));
    }

    #[test]
    fn clearing_a_reminder_also_rearms_to_null() {
        let mut existing = existing_lead();
        existing.reminder_at = Some(Utc.with_ymd_and_hms(2026, 9, 1, 6, 0, 0).unwrap());

        let changes = LeadChanges {
            status: Some("new".to_owned()),
            reminder_at: None,
            ..LeadChanges::default()
        };

        let (update, _) = plan_lead_update(&existing, &changes, Utc::now(), "ana");

        assert!(update.reminder_reset);
        assert_eq!(update.reminder_at, None);
    }

    #[test]
    fn quick_action_confirm_sets_status_and_contact() {
        let existing = existing_lead();
        let changes = LeadChanges {
            status: Some("new".to_owned()),
            quick_action: Some("confirm".to_owned()),
            ..LeadChanges::default()
        };
        let now = Utc::now();

        let (update, events) = plan_lead_update(&existing, &changes, now, "ana");

        assert_eq!(update.status, LeadStatus::Confirmed);
        assert_eq!(update.last_contacted_at, Some(now));
        assert_eq!(event_types(&events), vec!["status_changed", "contacted"]);
    }

    #[test]
    fn quick_action_reschedule_pushes_follow_up_a_day() {
        let existing = existing_lead();
        let changes = LeadChanges {
            status: Some("new".to_owned()),
            quick_action: Some("reschedule".to_owned()),
            ..LeadChanges::default()
        };
        let now = Utc::now();

        let (update, _) = plan_lead_update(&existing, &changes, now, "ana");

        assert_eq!(update.status, LeadStatus::Followup);
        assert_eq!(update.follow_up_at, Some(now + Duration::hours(24)));
    }

    #[test]
    fn note_logs_note_and_contacted_events() {
        let existing = existing_lead();
        let changes = LeadChanges {
            status: Some("new".to_owned()),
            new_note: Some("Cliente pediu carro maior".to_owned()),
            ..LeadChanges::default()
        };

        let (update, events) = plan_lead_update(&existing, &changes, Utc::now(), "ana");

        assert_eq!(
            update.follow_up_notes.as_deref(),
            Some("Cliente pediu carro maior")
        );
        assert!(update.last_contacted_at.is_some());
        assert_eq!(event_types(&events), vec!["note", "contacted"]);
    }

    #[test]
    fn invalid_status_and_priority_fall_back_to_defaults() {
        let existing = existing_lead();
        let changes = LeadChanges {
            status: Some("banana".to_owned()),
            priority: Some("urgent".to_owned()),
            ..LeadChanges::default()
        };

        let (update, _) = plan_lead_update(&existing, &changes, Utc::now(), "ana");

        assert_eq!(update.status, LeadStatus::New);
        assert_eq!(update.priority, LeadPriority::Warm);
    }

    #[test]
    fn csv_row_flattens_notes_separators() {
        let mut lead = existing_lead();
        lead.follow_up_notes = Some("linha um\nlinha, dois".to_owned());

        let row = csv_row(&lead);
        assert_eq!(row[17], "linha um linha  dois");
    }
}
