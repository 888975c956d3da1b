// src/db/job_repo.rs

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::jobs::{Job, JobKind, JobStatus},
};

/// Tabela `jobs`. Só insere e consulta; o worker externo consome.
#[derive(Clone, Default)]
pub struct JobRepository;

impl JobRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn enqueue<'e, E>(
        &self,
        executor: E,
        unidade_id: Option<Uuid>,
        kind: JobKind,
        payload: &Value,
        run_at: Option<DateTime<Utc>>,
    ) -> Result<Job, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (unidade_id, kind, payload, run_at)
            VALUES ($1, $2, $3, COALESCE($4, NOW()))
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(kind)
        .bind(payload)
        .bind(run_at)
        .fetch_one(executor)
        .await?;

        Ok(job)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<Option<Job>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE unidade_id = $1 AND id = $2")
            .bind(unidade_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(job)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        status: Option<JobStatus>,
    ) -> Result<Vec<Job>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE unidade_id = $1
              AND ($2::job_status IS NULL OR status = $2)
            ORDER BY run_at DESC
            LIMIT 100
            "#,
        )
        .bind(unidade_id)
        .bind(status)
        .fetch_all(executor)
        .await?;

        Ok(jobs)
    }
}
