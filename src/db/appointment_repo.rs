// src/db/appointment_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::appointments::{Appointment, AppointmentStatus, ConflictQuery},
};

#[derive(Clone, Default)]
pub struct AppointmentRepository;

impl AppointmentRepository {
    pub fn new() -> Self {
        Self
    }

    /// Pré-filtro de conflito: agendamentos não cancelados que usam algum
    /// dos recursos e cruzam a janela `[start, end)`.
    pub async fn find_overlapping<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        query: &ConflictQuery,
    ) -> Result<Vec<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM agendamentos
            WHERE unidade_id = $1
              AND resource_ids && $2
              AND status <> 'CANCELADO'
              AND start_at < $4
              AND end_at > $3
            ORDER BY start_at ASC
            "#,
        )
        .bind(unidade_id)
        .bind(&query.resource_ids)
        .bind(query.start)
        .bind(query.end)
        .fetch_all(executor)
        .await?;

        Ok(appointments)
    }

    /// Trava de transação por recurso. Chamar com os ids ordenados para
    /// não haver deadlock entre duas criações concorrentes.
    pub async fn lock_resource<'e, E>(&self, executor: E, resource_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(resource_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        client_id: Option<Uuid>,
        resource_ids: &[Uuid],
        service_name: &str,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<Appointment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO agendamentos (
                unidade_id, client_id, resource_ids, service_name, start_at, end_at, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(client_id)
        .bind(resource_ids)
        .bind(service_name)
        .bind(start_at)
        .bind(end_at)
        .bind(notes)
        .fetch_one(executor)
        .await?;

        Ok(appointment)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointment = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM agendamentos WHERE unidade_id = $1 AND id = $2",
        )
        .bind(unidade_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(appointment)
    }

    // Agenda de um intervalo (normalmente um dia)
    pub async fn list_between<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM agendamentos
            WHERE unidade_id = $1 AND start_at < $3 AND end_at > $2
            ORDER BY start_at ASC
            "#,
        )
        .bind(unidade_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(appointments)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE agendamentos
            SET status = $3, updated_at = NOW()
            WHERE unidade_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await?;
        Ok(appointment)
    }

    pub async fn update_times<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<Option<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE agendamentos
            SET start_at = $3, end_at = $4, updated_at = NOW()
            WHERE unidade_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(id)
        .bind(start_at)
        .bind(end_at)
        .fetch_optional(executor)
        .await?;
        Ok(appointment)
    }

    /// Enfileira os lembretes do agendamento (procedure do banco).
    pub async fn schedule_notifications<'e, E>(&self, executor: E, appointment_id: Uuid) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created: i32 = sqlx::query_scalar("SELECT schedule_appointment_notifications($1)")
            .bind(appointment_id)
            .fetch_one(executor)
            .await?;
        Ok(created)
    }
}
