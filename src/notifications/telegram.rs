// src/notifications/telegram.rs

use chrono::Utc;
use serde_json::json;

use super::normalize_phone;
use crate::models::lead::Lead;

// Aviso interno de lead novo para o grupo da operação. Não faz parte da
// cascata de lembretes: é melhor-esforço e nunca derruba a criação do lead.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramConfig {
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default();

        if bot_token.is_empty() || chat_id.is_empty() {
            return None;
        }

        Some(Self { bot_token, chat_id })
    }
}

#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    config: Option<TelegramConfig>,
}

impl TelegramNotifier {
    pub fn new(http: reqwest::Client, config: Option<TelegramConfig>) -> Self {
        Self { http, config }
    }

    pub async fn notify_new_lead(&self, lead: &Lead) -> bool {
        let Some(config) = &self.config else {
            return false;
        };

        let url = format!("https://api.telegram.org/bot{}/sendMessage", config.bot_token);
        let payload = json!({
            "chat_id": config.chat_id,
            "text": format_booking_message(lead),
            "parse_mode": "HTML",
        });

        match self.http.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!("Telegram recusou a notificação: {}", response.status());
                false
            }
            Err(e) => {
                tracing::warn!("Falha ao notificar o Telegram: {}", e);
                false
            }
        }
    }
}

fn format_booking_message(lead: &Lead) -> String {
    let trip_type = lead
        .trip_type
        .map(|t| t.label().to_owned())
        .unwrap_or_else(|| "Not specified".to_owned());

    let date_time = match (lead.pickup_date, lead.pickup_time) {
        (Some(date), Some(time)) => format!("{date} at {}", time.format("%H:%M")),
        (Some(date), None) => date.to_string(),
        (None, Some(time)) => time.format("%H:%M").to_string(),
        (None, None) => "Not specified".to_owned(),
    };

    let phone = display_phone(&lead.contact_phone);
    let source = lead.source.as_deref().unwrap_or("Website");

    format!(
        "🚕 <b>New Cabigo Booking!</b>\n\n\
         📍 <b>Pickup:</b> {}\n\
         📍 <b>Drop:</b> {}\n\
         📞 <b>Phone:</b> {}\n\
         🚗 <b>Trip Type:</b> {}\n\
         📅 <b>Date/Time:</b> {}\n\
         🌐 <b>Source:</b> {}\n\n\
         ━━━━━━━━━━━━━━━━━━━━\n\
         <i>Received at {}</i>",
        lead.pickup_location,
        lead.drop_location,
        phone,
        trip_type,
        date_time,
        source,
        Utc::now().format("%Y-%m-%d %H:%M UTC"),
    )
}

// Exibe o número sempre com +91, mesmo que o cliente já o tenha digitado.
fn display_phone(raw: &str) -> String {
    let digits = normalize_phone(raw);
    if digits.is_empty() {
        return raw.to_owned();
    }
    if let Some(rest) = digits.strip_prefix("91") {
        if digits.len() == 12 {
            return format!("+91{rest}");
        }
    }
    format!("+{digits}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_phone_prefixes_country_code() {
        assert_eq!(display_phone("9876543210"), "+919876543210");
        assert_eq!(display_phone("+91 98765 43210"), "+919876543210");
    }

    #[test]
    fn display_phone_keeps_foreign_numbers() {
        assert_eq!(display_phone("4412345678901"), "+4412345678901");
    }
}
