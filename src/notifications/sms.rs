// src/notifications/sms.rs

use async_trait::async_trait;
use serde_json::json;

use super::{ChannelOutcome, Recipient, ReminderChannel, ReminderMessage};

// Canal B: texto simples via gateway genérico de SMS.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: String,
}

impl SmsConfig {
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("SMS_API_URL").unwrap_or_default();
        let api_key = std::env::var("SMS_API_KEY").unwrap_or_default();

        if api_url.is_empty() || api_key.is_empty() {
            return None;
        }

        Some(Self { api_url, api_key })
    }
}

pub struct SmsChannel {
    http: reqwest::Client,
    config: Option<SmsConfig>,
}

impl SmsChannel {
    pub fn new(http: reqwest::Client, config: Option<SmsConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ReminderChannel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    async fn send(&self, to: &Recipient, message: &ReminderMessage) -> ChannelOutcome {
        if to.phone.is_empty() {
            return ChannelOutcome::NoRecipient;
        }
        let Some(config) = &self.config else {
            return ChannelOutcome::NotConfigured;
        };

        let payload = json!({
            "to": to.phone,
            "message": message.body(),
        });

        match self
            .http
            .post(&config.api_url)
            .header("apiKey", &config.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => ChannelOutcome::Delivered,
            Ok(response) => {
                let detail = response.text().await.unwrap_or_default();
                if detail.is_empty() {
                    ChannelOutcome::Failed("sms-error".to_owned())
                } else {
                    ChannelOutcome::Failed(detail)
                }
            }
            Err(e) => ChannelOutcome::Failed(e.to_string()),
        }
    }
}
