// src/services/booking_service.rs

use chrono::{NaiveDate, NaiveTime};

use crate::{
    common::error::AppError,
    db::{EventRepository, LeadRepository},
    models::lead::{Lead, NewLead, NewLeadEvent, TripType},
    notifications::TelegramNotifier,
};

// Limites de tamanho herdados do formulário público.
const MAX_LOCATION_LEN: usize = 160;
const MAX_PHONE_LEN: usize = 40;
const MAX_SHORT_FIELD_LEN: usize = 40;

/// Entrada crua do formulário público, antes da sanitização.
#[derive(Debug, Clone, Default)]
pub struct BookingRequest {
    pub pickup: String,
    pub drop: String,
    pub phone: String,
    pub trip_type: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub source: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct BookingService {
    leads: LeadRepository,
    events: EventRepository,
    telegram: TelegramNotifier,
}

impl BookingService {
    pub fn new(
        leads: LeadRepository,
        events: EventRepository,
        telegram: TelegramNotifier,
    ) -> Self {
        Self {
            leads,
            events,
            telegram,
        }
    }

    /// Intake público: sanitiza, insere o lead e dispara os efeitos
    /// colaterais de melhor-esforço (evento "created" + aviso no Telegram).
    pub async fn create_booking(&self, request: BookingRequest) -> Result<Lead, AppError> {
        let new_lead = sanitize_booking(&request)?;

        let lead = self.leads.insert(&new_lead).await?;

        if let Err(e) = self
            .events
            .insert(
                lead.id,
                &NewLeadEvent::new("created", "Lead created via website booking"),
            )
            .await
        {
            tracing::warn!("Falha ao registrar evento de criação do lead {}: {}", lead.id, e);
        }

        if !self.telegram.notify_new_lead(&lead).await {
            tracing::debug!("Aviso de lead novo no Telegram não foi enviado");
        }

        Ok(lead)
    }
}

// Sanitização do formulário público: trim + corte de tamanho, valores
// inválidos de tipo/data/hora viram NULL em vez de rejeitar.
fn sanitize_booking(request: &BookingRequest) -> Result<NewLead, AppError> {
    let pickup = clean(&request.pickup, MAX_LOCATION_LEN);
    let drop = clean(&request.drop, MAX_LOCATION_LEN);
    let phone = clean(&request.phone, MAX_PHONE_LEN);

    if pickup.is_empty() || drop.is_empty() || phone.is_empty() {
        return Err(AppError::MissingFields);
    }

    let trip_type = request
        .trip_type
        .as_deref()
        .and_then(|raw| TripType::try_from_raw(&clean(raw, MAX_SHORT_FIELD_LEN)));
    let source = request
        .source
        .as_deref()
        .map(|raw| clean(raw, MAX_SHORT_FIELD_LEN))
        .filter(|s| !s.is_empty());

    Ok(NewLead {
        pickup_location: pickup,
        drop_location: drop,
        contact_phone: phone,
        trip_type,
        pickup_date: request.date.as_deref().and_then(to_date),
        pickup_time: request.time.as_deref().and_then(to_time),
        source,
        referrer: request.referrer.clone().filter(|s| !s.is_empty()),
        user_agent: request.user_agent.clone().filter(|s| !s.is_empty()),
        ..NewLead::default()
    })
}

fn clean(value: &str, max_length: usize) -> String {
    value.trim().chars().take(max_length).collect()
}

fn to_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn to_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BookingRequest {
        BookingRequest {
            pickup: "  Siliguri  ".to_owned(),
            drop: "Darjeeling".to_owned(),
            phone: "9876543210".to_owned(),
            trip_type: Some("one-way".to_owned()),
            date: Some("2026-09-01".to_owned()),
            time: Some("07:30".to_owned()),
            source: Some("homepage".to_owned()),
            referrer: Some("https://example.com".to_owned()),
            user_agent: Some("Mozilla/5.0".to_owned()),
        }
    }

    #[test]
    fn sanitize_trims_and_parses_valid_input() {
        let lead = sanitize_booking(&request()).unwrap();
        assert_eq!(lead.pickup_location, "Siliguri");
        assert_eq!(lead.trip_type, Some(TripType::OneWay));
        assert_eq!(lead.pickup_date, NaiveDate::from_ymd_opt(2026, 9, 1));
        assert_eq!(lead.pickup_time, NaiveTime::from_hms_opt(7, 30, 0));
    }

    #[test]
    fn invalid_optionals_become_null_instead_of_rejecting() {
        let mut req = request();
        req.trip_type = Some("spaceship".to_owned());
        req.date = Some("01/09/2026".to_owned());
        req.time = Some("7h30".to_owned());

        let lead = sanitize_booking(&req).unwrap();
        assert_eq!(lead.trip_type, None);
        assert_eq!(lead.pickup_date, None);
        assert_eq!(lead.pickup_time, None);
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let mut req = request();
        req.phone = "   ".to_owned();
        assert!(matches!(
            sanitize_booking(&req),
            Err(AppError::MissingFields)
        ));
    }

    #[test]
    fn long_fields_are_truncated() {
        let mut req = request();
        req.pickup = "x".repeat(500);
        let lead = sanitize_booking(&req).unwrap();
        assert_eq!(lead.pickup_location.chars().count(), 160);
    }
}
