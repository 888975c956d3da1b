// src/db/queue_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::queue::{QueueEntry, QueueEntryView},
};

/// Acesso à tabela `barber_queue`. Toda mudança de posição passa pelas
/// procedures `barber_queue_*`; este repositório só as invoca e relê.
#[derive(Clone, Default)]
pub struct QueueRepository;

impl QueueRepository {
    pub fn new() -> Self {
        Self
    }

    // Ordem atual das entradas ativas, com o nome do profissional
    pub async fn list_active<'e, E>(&self, executor: E, unidade_id: Uuid) -> Result<Vec<QueueEntryView>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, QueueEntryView>(
            r#"
            SELECT q.*, p.name AS professional_name
            FROM barber_queue q
            JOIN profissionais p ON p.id = q.professional_id
            WHERE q.unidade_id = $1 AND q.is_active
            ORDER BY q.queue_position ASC
            "#,
        )
        .bind(unidade_id)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }

    /// Linha de fila do profissional cujo login é `user_id`.
    pub async fn find_by_user_id<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<QueueEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, QueueEntry>(
            r#"
            SELECT q.*
            FROM barber_queue q
            JOIN profissionais p ON p.id = q.professional_id
            WHERE q.unidade_id = $1 AND p.user_id = $2
            "#,
        )
        .bind(unidade_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(entry)
    }

    pub async fn find_by_professional_id<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        professional_id: Uuid,
    ) -> Result<Option<QueueEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, QueueEntry>(
            "SELECT * FROM barber_queue WHERE unidade_id = $1 AND professional_id = $2",
        )
        .bind(unidade_id)
        .bind(professional_id)
        .fetch_optional(executor)
        .await?;

        Ok(entry)
    }

    /// O profissional existe e pertence à unidade?
    pub async fn professional_in_unit<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        professional_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM profissionais WHERE id = $1 AND unidade_id = $2)",
        )
        .bind(professional_id)
        .bind(unidade_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    // =========================================================================
    //  PROCEDURES
    // =========================================================================

    pub async fn attend<'e, E>(&self, executor: E, entry_id: Uuid) -> Result<Vec<QueueEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ordering = sqlx::query_as::<_, QueueEntry>("SELECT * FROM barber_queue_attend($1)")
            .bind(entry_id)
            .fetch_all(executor)
            .await?;
        Ok(ordering)
    }

    pub async fn pass_turn<'e, E>(&self, executor: E, entry_id: Uuid) -> Result<Vec<QueueEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ordering = sqlx::query_as::<_, QueueEntry>("SELECT * FROM barber_queue_pass_turn($1)")
            .bind(entry_id)
            .fetch_all(executor)
            .await?;
        Ok(ordering)
    }

    pub async fn join<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        professional_id: Uuid,
    ) -> Result<Vec<QueueEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ordering = sqlx::query_as::<_, QueueEntry>("SELECT * FROM barber_queue_join($1, $2)")
            .bind(unidade_id)
            .bind(professional_id)
            .fetch_all(executor)
            .await?;
        Ok(ordering)
    }

    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        entry_id: Uuid,
        active: bool,
    ) -> Result<Vec<QueueEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ordering = sqlx::query_as::<_, QueueEntry>("SELECT * FROM barber_queue_set_active($1, $2)")
            .bind(entry_id)
            .bind(active)
            .fetch_all(executor)
            .await?;
        Ok(ordering)
    }

    /// Zera os contadores diários (virada do dia). Não mexe em posições.
    pub async fn reset_daily_counts<'e, E>(&self, executor: E, unidade_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE barber_queue
            SET daily_service_count = 0, updated_at = NOW()
            WHERE unidade_id = $1 AND daily_service_count <> 0
            "#,
        )
        .bind(unidade_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
