// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    db::{EventRepository, LeadRepository},
    notifications::{
        ReminderChannel, TelegramNotifier,
        email::{EmailChannel, EmailConfig},
        sms::{SmsChannel, SmsConfig},
        telegram::TelegramConfig,
        whatsapp::{WhatsAppChannel, WhatsAppConfig},
    },
    services::{
        AuthService, BookingService, LeadService, ReminderService,
        reminder_service::SqlReminderStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub booking_service: BookingService,
    pub lead_service: LeadService,
    pub reminder_service: ReminderService,

    // Segredo opcional do gatilho do dispatcher; None = endpoint aberto
    pub reminder_secret: Option<String>,
    pub google_maps_key: String,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // Cliente HTTP compartilhado pelos canais de saída
        let http = reqwest::Client::new();

        // --- Monta o gráfico de dependências ---
        let lead_repo = LeadRepository::new(db_pool.clone());
        let event_repo = EventRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            jwt_secret,
            env_opt("ADMIN_USERNAME"),
            env_opt("ADMIN_PASSWORD_HASH"),
        );

        let telegram = TelegramNotifier::new(http.clone(), TelegramConfig::from_env());
        let booking_service = BookingService::new(lead_repo.clone(), event_repo.clone(), telegram);

        let lead_service = LeadService::new(lead_repo.clone(), event_repo.clone());

        // Canais do dispatcher, na ordem de prioridade da cascata
        let channels: Vec<Arc<dyn ReminderChannel>> = vec![
            Arc::new(WhatsAppChannel::new(http.clone(), WhatsAppConfig::from_env())),
            Arc::new(SmsChannel::new(http.clone(), SmsConfig::from_env())),
            Arc::new(EmailChannel::new(EmailConfig::from_env())),
        ];
        let store = Arc::new(SqlReminderStore::new(lead_repo, event_repo));
        let reminder_service = ReminderService::new(store, channels);

        Ok(Self {
            db_pool,
            auth_service,
            booking_service,
            lead_service,
            reminder_service,
            reminder_secret: env_opt("REMINDER_CRON_SECRET"),
            google_maps_key: env::var("GOOGLE_MAPS_API_KEY").unwrap_or_default(),
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
