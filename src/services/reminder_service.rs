// src/services/reminder_service.rs
//
// O dispatcher de lembretes. A cada execução: seleciona os lembretes
// vencidos (até 50, mais antigos primeiro), tenta os canais em cascata
// (primeiro sucesso encerra o lead) e grava o desfecho + evento de auditoria.
//
// Entrega é at-least-once por desenho: não há lock distribuído entre duas
// execuções sobrepostas, e um lead "failed" ou "pending" volta a ser
// selecionado na próxima rodada até alguém enviar ou limpar o lembrete.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EventRepository, LeadRepository},
    models::lead::{DueReminder, NewLeadEvent, ReminderStateUpdate, ReminderStatus},
    notifications::{ChannelOutcome, Recipient, ReminderChannel, ReminderMessage},
};

/// Teto de leads por execução, para limitar a duração de uma rodada.
pub const MAX_BATCH: i64 = 50;

/// O texto de erro gravado no lead é truncado neste tamanho.
pub const ERROR_TEXT_LIMIT: usize = 500;

/// Contagens agregadas de uma rodada.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DispatchSummary {
    pub processed: u32,
    pub sent: u32,
    pub failed: u32,
    pub pending: u32,
}

/// Porta de acesso ao armazenamento de leads usada pelo dispatcher.
/// Injetada na construção para permitir um store fake nos testes.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn due_reminders(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DueReminder>, AppError>;

    async fn record_outcome(
        &self,
        lead_id: Uuid,
        outcome: &ReminderStateUpdate,
    ) -> Result<(), AppError>;

    async fn append_event(&self, lead_id: Uuid, event: NewLeadEvent) -> Result<(), AppError>;
}

// Adaptador Postgres da porta, por cima dos repositórios.
pub struct SqlReminderStore {
    leads: LeadRepository,
    events: EventRepository,
}

impl SqlReminderStore {
    pub fn new(leads: LeadRepository, events: EventRepository) -> Self {
        Self { leads, events }
    }
}

#[async_trait]
impl ReminderStore for SqlReminderStore {
    async fn due_reminders(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DueReminder>, AppError> {
        self.leads.due_reminders(now, limit).await
    }

    async fn record_outcome(
        &self,
        lead_id: Uuid,
        outcome: &ReminderStateUpdate,
    ) -> Result<(), AppError> {
        self.leads.record_reminder_outcome(lead_id, outcome).await
    }

    async fn append_event(&self, lead_id: Uuid, event: NewLeadEvent) -> Result<(), AppError> {
        self.events.insert(lead_id, &event).await
    }
}

// Resultado da cascata de canais para um lead.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct DeliveryReport {
    pub attempted: u32,
    pub delivered_via: Option<&'static str>,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
    channels: Vec<Arc<dyn ReminderChannel>>,
}

impl ReminderService {
    pub fn new(store: Arc<dyn ReminderStore>, channels: Vec<Arc<dyn ReminderChannel>>) -> Self {
        Self { store, channels }
    }

    /// Executa uma rodada completa. Só a consulta de seleção aborta a
    /// execução; falhas por lead ficam gravadas no próprio lead.
    pub async fn run(&self) -> Result<DispatchSummary, AppError> {
        let now = Utc::now();
        let due = self.store.due_reminders(now, MAX_BATCH).await?;

        let mut summary = DispatchSummary::default();

        for lead in due {
            summary.processed += 1;
            let report = self.deliver(&lead).await;
            self.settle(&lead, report, &mut summary).await;
        }

        tracing::info!(
            processed = summary.processed,
            sent = summary.sent,
            failed = summary.failed,
            pending = summary.pending,
            "rodada de lembretes concluída"
        );

        Ok(summary)
    }

    // Cascata sequencial: os canais são tentados na ordem da lista e o
    // primeiro sucesso encerra — é fallback, não broadcast.
    pub(crate) async fn deliver(&self, lead: &DueReminder) -> DeliveryReport {
        let recipient = Recipient::for_lead(lead);
        let message = ReminderMessage::for_trip(lead);

        let mut report = DeliveryReport::default();

        for channel in &self.channels {
            if report.delivered_via.is_some() {
                break;
            }
            match channel.send(&recipient, &message).await {
                ChannelOutcome::Delivered => {
                    report.attempted += 1;
                    report.delivered_via = Some(channel.name());
                }
                ChannelOutcome::Failed(detail) => {
                    report.attempted += 1;
                    report.errors.push(format!("{}:{}", channel.name(), detail));
                }
                ChannelOutcome::NotConfigured => {
                    // Lacuna de configuração: registrada, mas não conta
                    // como tentativa real de entrega.
                    report.errors.push(format!("{}:missing-config", channel.name()));
                }
                ChannelOutcome::NoRecipient => {}
            }
        }

        if !recipient.has_any() {
            report.errors.push("missing-contact".to_owned());
        }

        report
    }

    // Classifica o desfecho, atualiza o lead e registra o evento. Escritas
    // aqui são melhor-esforço: o lote continua mesmo se uma falhar, e o
    // lead volta a ser selecionado na próxima rodada.
    async fn settle(&self, lead: &DueReminder, report: DeliveryReport, summary: &mut DispatchSummary) {
        let now = Utc::now();
        let joined = truncate_error(&report.errors.join(" | "));

        let (outcome, event) = if let Some(via) = report.delivered_via {
            summary.sent += 1;
            (
                ReminderStateUpdate {
                    status: ReminderStatus::Sent,
                    sent_at: Some(now),
                    error: None,
                    last_contacted_at: Some(now),
                },
                Some(NewLeadEvent::new(
                    "reminder_sent",
                    &format!("Reminder sent via {via}"),
                )),
            )
        } else if report.attempted > 0 {
            summary.failed += 1;
            (
                ReminderStateUpdate {
                    status: ReminderStatus::Failed,
                    sent_at: None,
                    error: Some(joined.clone()),
                    last_contacted_at: None,
                },
                Some(NewLeadEvent::new("reminder_failed", &joined)),
            )
        } else {
            // Só lacunas de configuração ou lead sem contato: continua
            // pendente e nenhum evento é registrado.
            summary.pending += 1;
            (
                ReminderStateUpdate {
                    status: ReminderStatus::Pending,
                    sent_at: None,
                    error: (!joined.is_empty()).then_some(joined),
                    last_contacted_at: None,
                },
                None,
            )
        };

        if let Err(e) = self.store.record_outcome(lead.id, &outcome).await {
            tracing::warn!("Falha ao gravar desfecho do lembrete {}: {}", lead.id, e);
        }

        if let Some(event) = event {
            if let Err(e) = self.store.append_event(lead.id, event).await {
                tracing::warn!("Falha ao registrar evento do lembrete {}: {}", lead.id, e);
            }
        }
    }
}

fn truncate_error(text: &str) -> String {
    text.chars().take(ERROR_TEXT_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    // --- Fakes ---

    #[derive(Default)]
    struct FakeStore {
        due: Vec<DueReminder>,
        fail_query: bool,
        limit_seen: Mutex<Option<i64>>,
        outcomes: Mutex<Vec<(Uuid, ReminderStateUpdate)>>,
        events: Mutex<Vec<(Uuid, NewLeadEvent)>>,
    }

    #[async_trait]
    impl ReminderStore for FakeStore {
        async fn due_reminders(
            &self,
            _now: DateTime<Utc>,
            limit: i64,
        ) -> Result<Vec<DueReminder>, AppError> {
            *self.limit_seen.lock().unwrap() = Some(limit);
            if self.fail_query {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "store indisponível"
                )));
            }
            Ok(self.due.clone())
        }

        async fn record_outcome(
            &self,
            lead_id: Uuid,
            outcome: &ReminderStateUpdate,
        ) -> Result<(), AppError> {
            self.outcomes.lock().unwrap().push((lead_id, outcome.clone()));
            Ok(())
        }

        async fn append_event(&self, lead_id: Uuid, event: NewLeadEvent) -> Result<(), AppError> {
            self.events.lock().unwrap().push((lead_id, event));
            Ok(())
        }
    }

    struct FakeChannel {
        name: &'static str,
        outcome: ChannelOutcome,
        hits: AtomicUsize,
    }

    impl FakeChannel {
        fn new(name: &'static str, outcome: ChannelOutcome) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                hits: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReminderChannel for FakeChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn send(&self, to: &Recipient, _message: &ReminderMessage) -> ChannelOutcome {
            let needs_email = self.name == "email";
            if (needs_email && to.email.is_empty()) || (!needs_email && to.phone.is_empty()) {
                return ChannelOutcome::NoRecipient;
            }
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn due_lead(phone: &str, email: Option<&str>) -> DueReminder {
        DueReminder {
            id: Uuid::new_v4(),
            pickup_location: "Siliguri".to_owned(),
            drop_location: "Darjeeling".to_owned(),
            pickup_date: None,
            pickup_time: None,
            contact_phone: phone.to_owned(),
            contact_email: email.map(str::to_owned),
            reminder_at: Some(Utc::now()),
            reminder_status: None,
        }
    }

    fn service(
        store: Arc<FakeStore>,
        channels: Vec<Arc<FakeChannel>>,
    ) -> ReminderService {
        let channels = channels
            .into_iter()
            .map(|c| c as Arc<dyn ReminderChannel>)
            .collect();
        ReminderService::new(store, channels)
    }

    // --- Testes ---

    #[tokio::test]
    async fn first_success_stops_the_waterfall() {
        let store = Arc::new(FakeStore {
            due: vec![due_lead("9876543210", Some("rider@example.com"))],
            ..FakeStore::default()
        });
        let whatsapp = FakeChannel::new("whatsapp", ChannelOutcome::Delivered);
        let sms = FakeChannel::new("sms", ChannelOutcome::Delivered);
        let email = FakeChannel::new("email", ChannelOutcome::Delivered);
        let svc = service(store.clone(), vec![whatsapp.clone(), sms.clone(), email.clone()]);

        let summary = svc.run().await.unwrap();

        assert_eq!(summary, DispatchSummary { processed: 1, sent: 1, failed: 0, pending: 0 });
        assert_eq!(whatsapp.hits.load(Ordering::SeqCst), 1);
        assert_eq!(sms.hits.load(Ordering::SeqCst), 0);
        assert_eq!(email.hits.load(Ordering::SeqCst), 0);

        let outcomes = store.outcomes.lock().unwrap();
        let (_, outcome) = &outcomes[0];
        assert_eq!(outcome.status, ReminderStatus::Sent);
        assert!(outcome.sent_at.is_some());
        assert!(outcome.last_contacted_at.is_some());
        assert_eq!(outcome.error, None);

        let events = store.events.lock().unwrap();
        assert_eq!(events[0].1.event_type, "reminder_sent");
        assert_eq!(events[0].1.message.as_deref(), Some("Reminder sent via whatsapp"));
    }

    #[tokio::test]
    async fn config_gap_does_not_count_as_attempt() {
        // WhatsApp sem configuração, SMS falhando de verdade, e-mail entrega:
        // duas tentativas reais, desfecho "sent" via email.
        let lead = due_lead("9876543210", Some("rider@example.com"));
        let store = Arc::new(FakeStore { due: vec![lead.clone()], ..FakeStore::default() });
        let whatsapp = FakeChannel::new("whatsapp", ChannelOutcome::NotConfigured);
        let sms = FakeChannel::new("sms", ChannelOutcome::Failed("gateway timeout".to_owned()));
        let email = FakeChannel::new("email", ChannelOutcome::Delivered);
        let svc = service(store.clone(), vec![whatsapp, sms, email]);

        let report = svc.deliver(&lead).await;
        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered_via, Some("email"));
        assert_eq!(
            report.errors,
            vec!["whatsapp:missing-config", "sms:gateway timeout"]
        );

        let summary = svc.run().await.unwrap();
        assert_eq!(summary.sent, 1);

        let outcomes = store.outcomes.lock().unwrap();
        assert_eq!(outcomes[0].1.status, ReminderStatus::Sent);
        assert_eq!(outcomes[0].1.error, None);

        let events = store.events.lock().unwrap();
        assert_eq!(events[0].1.message.as_deref(), Some("Reminder sent via email"));
    }

    #[tokio::test]
    async fn missing_contact_stays_pending_without_event() {
        let store = Arc::new(FakeStore {
            due: vec![due_lead("", None)],
            ..FakeStore::default()
        });
        let whatsapp = FakeChannel::new("whatsapp", ChannelOutcome::Delivered);
        let email = FakeChannel::new("email", ChannelOutcome::Delivered);
        let svc = service(store.clone(), vec![whatsapp.clone(), email.clone()]);

        let summary = svc.run().await.unwrap();

        assert_eq!(summary, DispatchSummary { processed: 1, sent: 0, failed: 0, pending: 1 });
        assert_eq!(whatsapp.hits.load(Ordering::SeqCst), 0);
        assert_eq!(email.hits.load(Ordering::SeqCst), 0);

        let outcomes = store.outcomes.lock().unwrap();
        assert_eq!(outcomes[0].1.status, ReminderStatus::Pending);
        assert_eq!(outcomes[0].1.error.as_deref(), Some("missing-contact"));

        assert!(store.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_config_gaps_stay_pending_with_reasons() {
        let store = Arc::new(FakeStore {
            due: vec![due_lead("9876543210", None)],
            ..FakeStore::default()
        });
        let whatsapp = FakeChannel::new("whatsapp", ChannelOutcome::NotConfigured);
        let sms = FakeChannel::new("sms", ChannelOutcome::NotConfigured);
        let svc = service(store.clone(), vec![whatsapp, sms]);

        let summary = svc.run().await.unwrap();

        assert_eq!(summary.pending, 1);
        let outcomes = store.outcomes.lock().unwrap();
        assert_eq!(outcomes[0].1.status, ReminderStatus::Pending);
        assert_eq!(
            outcomes[0].1.error.as_deref(),
            Some("whatsapp:missing-config | sms:missing-config")
        );
        assert!(store.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_real_failures_record_joined_truncated_error() {
        let long_reason = "x".repeat(400);
        let store = Arc::new(FakeStore {
            due: vec![due_lead("9876543210", Some("rider@example.com"))],
            ..FakeStore::default()
        });
        let whatsapp = FakeChannel::new("whatsapp", ChannelOutcome::Failed(long_reason.clone()));
        let sms = FakeChannel::new("sms", ChannelOutcome::Failed(long_reason.clone()));
        let email = FakeChannel::new("email", ChannelOutcome::Failed("smtp down".to_owned()));
        let svc = service(store.clone(), vec![whatsapp, sms, email]);

        let summary = svc.run().await.unwrap();

        assert_eq!(summary, DispatchSummary { processed: 1, sent: 0, failed: 1, pending: 0 });

        let outcomes = store.outcomes.lock().unwrap();
        let error = outcomes[0].1.error.as_deref().unwrap();
        assert_eq!(error.chars().count(), ERROR_TEXT_LIMIT);
        assert!(error.starts_with("whatsapp:xxx"));
        assert!(error.contains(" | sms:"));

        let events = store.events.lock().unwrap();
        assert_eq!(events[0].1.event_type, "reminder_failed");
        assert_eq!(events[0].1.message.as_deref(), Some(error));
    }

    #[tokio::test]
    async fn empty_batch_reports_zero_processed() {
        let store = Arc::new(FakeStore::default());
        let svc = service(store.clone(), vec![]);

        let summary = svc.run().await.unwrap();

        assert_eq!(summary, DispatchSummary::default());
        assert!(store.outcomes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_is_capped_at_fifty() {
        let store = Arc::new(FakeStore::default());
        let svc = service(store.clone(), vec![]);

        svc.run().await.unwrap();

        assert_eq!(*store.limit_seen.lock().unwrap(), Some(MAX_BATCH));
    }

    #[tokio::test]
    async fn selection_failure_aborts_the_run() {
        let store = Arc::new(FakeStore { fail_query: true, ..FakeStore::default() });
        let svc = service(store.clone(), vec![]);

        assert!(svc.run().await.is_err());
        assert!(store.outcomes.lock().unwrap().is_empty());
    }
}
