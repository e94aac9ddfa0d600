// src/notifications/whatsapp.rs

use async_trait::async_trait;
use serde_json::json;

use super::{ChannelOutcome, Recipient, ReminderChannel, ReminderMessage};

// Canal A: mensagem templada via API estilo WhatsApp Cloud.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub api_token: String,
    pub phone_number_id: String,
    pub template_name: String,
}

impl WhatsAppConfig {
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("WHATSAPP_API_URL").unwrap_or_default();
        let api_token = std::env::var("WHATSAPP_API_TOKEN").unwrap_or_default();
        let phone_number_id = std::env::var("WHATSAPP_PHONE_NUMBER_ID").unwrap_or_default();
        let template_name = std::env::var("WHATSAPP_TEMPLATE_REMINDER").unwrap_or_default();

        if api_url.is_empty()
            || api_token.is_empty()
            || phone_number_id.is_empty()
            || template_name.is_empty()
        {
            return None;
        }

        Some(Self {
            api_url,
            api_token,
            phone_number_id,
            template_name,
        })
    }
}

pub struct WhatsAppChannel {
    http: reqwest::Client,
    config: Option<WhatsAppConfig>,
}

impl WhatsAppChannel {
    pub fn new(http: reqwest::Client, config: Option<WhatsAppConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ReminderChannel for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, to: &Recipient, message: &ReminderMessage) -> ChannelOutcome {
        if to.phone.is_empty() {
            return ChannelOutcome::NoRecipient;
        }
        let Some(config) = &self.config else {
            return ChannelOutcome::NotConfigured;
        };

        let parameters: Vec<_> = message
            .template_params()
            .into_iter()
            .map(|text| json!({ "type": "text", "text": text }))
            .collect();

        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to.phone,
            "type": "template",
            "template": {
                "name": config.template_name,
                "language": { "code": "en" },
                "components": [
                    { "type": "body", "parameters": parameters }
                ]
            }
        });

        let url = format!("{}/v3/{}/messages", config.api_url, config.phone_number_id);
        match self
            .http
            .post(&url)
            .header("apiKey", &config.api_token)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => ChannelOutcome::Delivered,
            Ok(response) => {
                let detail = response.text().await.unwrap_or_default();
                if detail.is_empty() {
                    ChannelOutcome::Failed("whatsapp-error".to_owned())
                } else {
                    ChannelOutcome::Failed(detail)
                }
            }
            Err(e) => ChannelOutcome::Failed(e.to_string()),
        }
    }
}
