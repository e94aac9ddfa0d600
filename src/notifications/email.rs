// src/notifications/email.rs

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};

use super::{ChannelOutcome, EMAIL_SUBJECT, Recipient, ReminderChannel, ReminderMessage};

// Canal C: e-mail via SMTP. O flag SMTP_SECURE escolhe entre TLS implícito
// e STARTTLS.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl EmailConfig {
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").unwrap_or_default();
        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|raw| raw.parse::<u16>().ok())
            .unwrap_or(0);
        let secure = std::env::var("SMTP_SECURE").unwrap_or_default() == "true";
        let user = std::env::var("SMTP_USER").unwrap_or_default();
        let pass = std::env::var("SMTP_PASS").unwrap_or_default();
        let from = std::env::var("REMINDER_EMAIL_FROM")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| user.clone());

        if host.is_empty() || port == 0 || user.is_empty() || pass.is_empty() || from.is_empty() {
            return None;
        }

        Some(Self {
            host,
            port,
            secure,
            user,
            pass,
            from,
        })
    }
}

pub struct EmailChannel {
    config: Option<EmailConfig>,
}

impl EmailChannel {
    pub fn new(config: Option<EmailConfig>) -> Self {
        Self { config }
    }

    async fn deliver(config: &EmailConfig, to: &str, body: String) -> Result<(), String> {
        let email = Message::builder()
            .from(config.from.parse().map_err(|e| format!("from: {e}"))?)
            .to(to.parse().map_err(|e| format!("to: {e}"))?)
            .subject(EMAIL_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| e.to_string())?;

        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| e.to_string())?;

        let mailer = builder
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();

        mailer.send(email).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[async_trait]
impl ReminderChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, to: &Recipient, message: &ReminderMessage) -> ChannelOutcome {
        if to.email.is_empty() {
            return ChannelOutcome::NoRecipient;
        }
        let Some(config) = &self.config else {
            return ChannelOutcome::NotConfigured;
        };

        match Self::deliver(config, &to.email, message.body()).await {
            Ok(()) => ChannelOutcome::Delivered,
            Err(detail) => ChannelOutcome::Failed(detail),
        }
    }
}
