// src/services/job_service.rs

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::JobRepository,
    models::jobs::{Job, JobKind, JobStatus},
};

/// Enfileira e consulta jobs. A execução (worker, retentativas) é externa.
#[derive(Clone)]
pub struct JobService {
    repo: JobRepository,
}

impl JobService {
    pub fn new(repo: JobRepository) -> Self {
        Self { repo }
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
        let job = self.repo.enqueue(executor, unidade_id, kind, payload, run_at).await?;
        tracing::debug!("Job {} ({:?}) enfileirado para {}", job.id, job.kind, job.run_at);
        Ok(job)
    }

    pub async fn get<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<Job, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, unidade_id, id)
            .await?
            .ok_or(AppError::NotFound("job"))
    }

    pub async fn list<'e, E>(&self, executor: E, unidade_id: Uuid, status: Option<JobStatus>) -> Result<Vec<Job>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list(executor, unidade_id, status).await
    }
}
