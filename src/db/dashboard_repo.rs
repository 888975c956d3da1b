// src/db/dashboard_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

// Contadores do painel. Receita e meta vêm do FinanceRepository.
#[derive(Clone, Default)]
pub struct DashboardRepository;

impl DashboardRepository {
    pub fn new() -> Self {
        Self
    }

    // Agendamentos não cancelados que começam em [from, to)
    pub async fn count_appointments<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM agendamentos
            WHERE unidade_id = $1
              AND status <> 'CANCELADO'
              AND start_at >= $2
              AND start_at < $3
            "#,
        )
        .bind(unidade_id)
        .bind(from)
        .bind(to)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }

    pub async fn count_active_in_queue<'e, E>(&self, executor: E, unidade_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM barber_queue WHERE unidade_id = $1 AND is_active",
        )
        .bind(unidade_id)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }
}
