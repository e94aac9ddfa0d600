// src/db/lead_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::lead::{DueReminder, Lead, LeadFilter, LeadUpdate, NewLead, ReminderStateUpdate},
};

// Limite da listagem do painel (o dashboard nunca pagina além disso)
const LIST_LIMIT: i64 = 250;

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new_lead: &NewLead) -> Result<Lead, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                pickup_location, drop_location, pickup_date, pickup_time,
                trip_type, contact_phone, contact_email, customer_name,
                source, referrer, user_agent,
                status, priority, owner_name,
                follow_up_at, reminder_at, follow_up_notes
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                COALESCE($12, 'new'), COALESCE($13, 'warm'), $14, $15, $16, $17
            )
            RETURNING *
            "#,
        )
        .bind(&new_lead.pickup_location)
        .bind(&new_lead.drop_location)
        .bind(new_lead.pickup_date)
        .bind(new_lead.pickup_time)
        .bind(new_lead.trip_type)
        .bind(&new_lead.contact_phone)
        .bind(&new_lead.contact_email)
        .bind(&new_lead.customer_name)
        .bind(&new_lead.source)
        .bind(&new_lead.referrer)
        .bind(&new_lead.user_agent)
        .bind(new_lead.status)
        .bind(new_lead.priority)
        .bind(&new_lead.owner_name)
        .bind(new_lead.follow_up_at)
        .bind(new_lead.reminder_at)
        .bind(&new_lead.follow_up_notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(lead)
    }

    /// Listagem do painel: filtros opcionais, mais recentes primeiro.
    pub async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM leads WHERE TRUE");

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND priority = ").push_bind(priority);
        }
        if let Some(owner) = &filter.owner {
            qb.push(" AND owner_name ILIKE ").push_bind(format!("%{owner}%"));
        }
        if let Some(date) = filter.pickup_date {
            qb.push(" AND pickup_date = ").push_bind(date);
        }
        if let Some(source) = &filter.source {
            qb.push(" AND source ILIKE ").push_bind(format!("%{source}%"));
        }
        if let Some(q) = &filter.q {
            let like = format!("%{q}%");
            qb.push(" AND (pickup_location ILIKE ")
                .push_bind(like.clone())
                .push(" OR drop_location ILIKE ")
                .push_bind(like.clone())
                .push(" OR contact_phone ILIKE ")
                .push_bind(like.clone())
                .push(" OR contact_email ILIKE ")
                .push_bind(like)
                .push(")");
        }

        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(LIST_LIMIT);

        let leads = qb.build_query_as::<Lead>().fetch_all(&self.pool).await?;

        Ok(leads)
    }

    pub async fn update(&self, id: Uuid, changes: &LeadUpdate) -> Result<(), AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE leads SET status = ");
        qb.push_bind(changes.status);
        qb.push(", follow_up_at = ").push_bind(changes.follow_up_at);
        qb.push(", reminder_at = ").push_bind(changes.reminder_at);
        qb.push(", owner_name = ").push_bind(&changes.owner_name);
        qb.push(", priority = ").push_bind(changes.priority);
        qb.push(", contact_email = ").push_bind(&changes.contact_email);

        if let Some(notes) = &changes.follow_up_notes {
            qb.push(", follow_up_notes = ").push_bind(notes);
        }
        if let Some(contacted_at) = changes.last_contacted_at {
            qb.push(", last_contacted_at = ").push_bind(contacted_at);
        }

        // Mudou o horário do lembrete: re-arma (pending) ou desativa (NULL),
        // sempre zerando sent_at/error.
        if changes.reminder_reset {
            let new_status = changes
                .reminder_at
                .map(|_| crate::models::lead::ReminderStatus::Pending);
            qb.push(", reminder_status = ").push_bind(new_status);
            qb.push(", reminder_sent_at = NULL, reminder_error = NULL");
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.build().execute(&self.pool).await?;

        Ok(())
    }

    /// Seleção do dispatcher: lembretes vencidos que ainda não foram
    /// enviados com sucesso, mais antigos primeiro, lote limitado.
    pub async fn due_reminders(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DueReminder>, AppError> {
        let due = sqlx::query_as::<_, DueReminder>(
            r#"
            SELECT id, pickup_location, drop_location, pickup_date, pickup_time,
                   contact_phone, contact_email, reminder_at, reminder_status
            FROM leads
            WHERE reminder_at IS NOT NULL
              AND reminder_at <= $1
              AND (reminder_status IS NULL OR reminder_status IN ('pending', 'failed'))
            ORDER BY reminder_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(due)
    }

    pub async fn record_reminder_outcome(
        &self,
        id: Uuid,
        outcome: &ReminderStateUpdate,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE leads
            SET reminder_status = $2,
                reminder_sent_at = $3,
                reminder_error = $4,
                last_contacted_at = COALESCE($5, last_contacted_at)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(outcome.status)
        .bind(outcome.sent_at)
        .bind(&outcome.error)
        .bind(outcome.last_contacted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
