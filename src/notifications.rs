// src/notifications.rs
//
// Canais de saída do lembrete de viagem. Cada canal é um adaptador uniforme
// (`ReminderChannel`): o dispatcher percorre a lista em ordem de prioridade
// e para no primeiro sucesso. Adicionar um quarto canal é só acrescentar um
// item na lista montada em `config.rs`.

pub mod email;
pub mod sms;
pub mod telegram;
pub mod whatsapp;

pub use email::EmailChannel;
pub use sms::SmsChannel;
pub use telegram::TelegramNotifier;
pub use whatsapp::WhatsAppChannel;

use async_trait::async_trait;

use crate::models::lead::DueReminder;

/// Resultado tipado de uma tentativa de envio.
///
/// `NotConfigured` é uma lacuna de configuração, não uma falha de entrega:
/// entra no texto de erro do lead mas não conta como tentativa real.
/// `NoRecipient` significa que o lead não tem o contato que o canal usa.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome {
    Delivered,
    Failed(String),
    NotConfigured,
    NoRecipient,
}

#[async_trait]
pub trait ReminderChannel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, to: &Recipient, message: &ReminderMessage) -> ChannelOutcome;
}

/// Contatos do lead já normalizados. Strings vazias significam "sem contato".
#[derive(Debug, Clone)]
pub struct Recipient {
    pub phone: String,
    pub email: String,
}

impl Recipient {
    pub fn for_lead(lead: &DueReminder) -> Self {
        Self {
            phone: normalize_phone(&lead.contact_phone),
            email: lead
                .contact_email
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_owned(),
        }
    }

    pub fn has_any(&self) -> bool {
        !self.phone.is_empty() || !self.email.is_empty()
    }
}

/// Texto do lembrete, com placeholders quando a viagem não tem data/hora.
#[derive(Debug, Clone)]
pub struct ReminderMessage {
    pub pickup: String,
    pub drop: String,
    pub date_label: String,
    pub time_label: String,
}

pub const EMAIL_SUBJECT: &str = "Cabigo trip reminder";

impl ReminderMessage {
    pub fn for_trip(lead: &DueReminder) -> Self {
        Self {
            pickup: lead.pickup_location.clone(),
            drop: lead.drop_location.clone(),
            date_label: lead
                .pickup_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "your travel date".to_owned()),
            time_label: lead
                .pickup_time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| "your travel time".to_owned()),
        }
    }

    pub fn body(&self) -> String {
        format!(
            "Cabigo reminder: Your trip from {} to {} on {} {}. Please reply to confirm.",
            self.pickup, self.drop, self.date_label, self.time_label
        )
    }

    /// Variáveis do template do WhatsApp, na ordem do corpo aprovado.
    pub fn template_params(&self) -> Vec<String> {
        vec![
            self.pickup.clone(),
            self.drop.clone(),
            format!("{} {}", self.date_label, self.time_label),
        ]
    }
}

/// Normaliza o telefone para o formato internacional sem "+".
///
/// 10 dígitos é assumido como número doméstico (prefixo 91); 11 dígitos
/// começando com 0 tem o 0 trocado pelo 91; 12 dígitos já com 91 passa
/// direto. Qualquer outra sequência não vazia passa sem mexer.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }
    if digits.len() == 10 {
        return format!("91{digits}");
    }
    if digits.len() == 12 && digits.starts_with("91") {
        return digits;
    }
    if digits.len() == 11 && digits.starts_with('0') {
        return format!("91{}", &digits[1..]);
    }
    digits
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use rstest::rstest;
    use uuid::Uuid;

    use super::*;

    #[rstest]
    #[case("9876543210", "919876543210")]
    #[case("919876543210", "919876543210")]
    #[case("09876543210", "919876543210")]
    #[case("+91 98765 43210", "919876543210")]
    #[case("98-76-54-32-10", "919876543210")]
    #[case("12345678", "12345678")]
    #[case("", "")]
    #[case("abc", "")]
    fn normalize_phone_cases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_phone(raw), expected);
    }

    fn due(date: Option<NaiveDate>, time: Option<NaiveTime>) -> DueReminder {
        DueReminder {
            id: Uuid::new_v4(),
            pickup_location: "Siliguri".to_owned(),
            drop_location: "Bagdogra".to_owned(),
            pickup_date: date,
            pickup_time: time,
            contact_phone: "9876543210".to_owned(),
            contact_email: Some("  rider@example.com ".to_owned()),
            reminder_at: None,
            reminder_status: None,
        }
    }

    #[test]
    fn message_body_with_date_and_time() {
        let lead = due(
            NaiveDate::from_ymd_opt(2026, 9, 1),
            NaiveTime::from_hms_opt(7, 30, 0),
        );
        let message = ReminderMessage::for_trip(&lead);
        assert_eq!(
            message.body(),
            "Cabigo reminder: Your trip from Siliguri to Bagdogra on 2026-09-01 07:30. \
             Please reply to confirm."
        );
    }

    #[test]
    fn message_body_uses_placeholders_when_trip_has_no_schedule() {
        let message = ReminderMessage::for_trip(&due(None, None));
        assert!(message.body().contains("on your travel date your travel time"));
    }

    #[test]
    fn template_params_join_date_and_time() {
        let lead = due(
            NaiveDate::from_ymd_opt(2026, 9, 1),
            NaiveTime::from_hms_opt(7, 30, 0),
        );
        let params = ReminderMessage::for_trip(&lead).template_params();
        assert_eq!(params, vec!["Siliguri", "Bagdogra", "2026-09-01 07:30"]);
    }

    #[test]
    fn recipient_normalizes_phone_and_trims_email() {
        let recipient = Recipient::for_lead(&due(None, None));
        assert_eq!(recipient.phone, "919876543210");
        assert_eq!(recipient.email, "rider@example.com");
        assert!(recipient.has_any());
    }
}
