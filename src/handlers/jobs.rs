// src/handlers/jobs.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_rls_transaction,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::jobs::{Job, JobKind, JobStatus},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueJobPayload {
    pub kind: JobKind,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Value,
    /// Sem valor, o job fica disponível imediatamente
    pub run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobFilter {
    #[param(value_type = Option<String>, example = "PENDING")]
    pub status: Option<JobStatus>,
}

// POST /api/jobs
#[utoipa::path(
    post,
    path = "/api/jobs",
    tag = "Jobs",
    request_body = EnqueueJobPayload,
    responses((status = 201, description = "Job enfileirado", body = Job)),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn enqueue_job(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Json(payload): Json<EnqueueJobPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let job = app_state
        .job_service
        .enqueue(&mut *tx, Some(tenant.0), payload.kind, &payload.payload, payload.run_at)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(job)))
}

// GET /api/jobs?status=
#[utoipa::path(
    get,
    path = "/api/jobs",
    tag = "Jobs",
    responses((status = 200, description = "Últimos jobs da unidade", body = Vec<Job>)),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), JobFilter),
    security(("api_jwt" = []))
)]
pub async fn list_jobs(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Query(filter): Query<JobFilter>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let jobs = app_state
        .job_service
        .list(&mut *tx, tenant.0, filter.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(jobs))
}

// GET /api/jobs/{id}
#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    tag = "Jobs",
    responses(
        (status = 200, description = "Job", body = Job),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn get_job(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let job = app_state
        .job_service
        .get(&mut *tx, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(job))
}
