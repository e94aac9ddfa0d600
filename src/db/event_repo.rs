// src/db/event_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::lead::{LeadEvent, NewLeadEvent},
};

// Histórico append-only: só existe INSERT e SELECT aqui, de propósito.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, lead_id: Uuid, event: &NewLeadEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO lead_events (lead_id, event_type, message, meta, created_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(lead_id)
        .bind(&event.event_type)
        .bind(&event.message)
        .bind(&event.meta)
        .bind(&event.created_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_many(
        &self,
        lead_id: Uuid,
        events: &[NewLeadEvent],
    ) -> Result<(), AppError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO lead_events (lead_id, event_type, message, meta, created_by) ",
        );
        qb.push_values(events, |mut row, event| {
            row.push_bind(lead_id)
                .push_bind(&event.event_type)
                .push_bind(&event.message)
                .push_bind(&event.meta)
                .push_bind(&event.created_by);
        });
        qb.build().execute(&self.pool).await?;

        Ok(())
    }

    pub async fn list_for_lead(&self, lead_id: Uuid) -> Result<Vec<LeadEvent>, AppError> {
        let events = sqlx::query_as::<_, LeadEvent>(
            "SELECT * FROM lead_events WHERE lead_id = $1 ORDER BY created_at DESC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
