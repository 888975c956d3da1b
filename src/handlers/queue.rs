// src/handlers/queue.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_rls_transaction,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::queue::{QueueAdvanceResponse, QueueEntryView},
    services::queue_service::QueueCaller,
};

// Corpo opcional de atender / passar a vez
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvancePayload {
    /// Sem valor, usa o profissional do usuário logado
    pub professional_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueuePayload {
    pub professional_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActivePayload {
    pub active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetDailyResponse {
    pub reset_entries: u64,
}

pub(crate) fn parse_advance_body(body: &Bytes) -> Result<AdvancePayload, AppError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(AdvancePayload::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::InvalidPayload(e.to_string()))
}

// GET /api/fila
#[utoipa::path(
    get,
    path = "/api/fila",
    tag = "Fila",
    responses((status = 200, description = "Ordem atual da fila", body = Vec<QueueEntryView>)),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn get_queue(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
) -> Result<Json<Vec<QueueEntryView>>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let queue = app_state
        .queue_service
        .list(&mut *tx, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(queue))
}

// POST /api/fila/atender
#[utoipa::path(
    post,
    path = "/api/fila/atender",
    tag = "Fila",
    request_body(content = AdvancePayload, description = "Opcional"),
    responses(
        (status = 200, description = "Nova ordem; `queue` nulo quando não há entrada para o usuário", body = QueueAdvanceResponse)
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn attend_turn(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    body: Bytes,
) -> Result<Json<QueueAdvanceResponse>, ApiError> {
    advance(app_state, locale, tenant, user, body, true).await
}

// POST /api/fila/passar
#[utoipa::path(
    post,
    path = "/api/fila/passar",
    tag = "Fila",
    request_body(content = AdvancePayload, description = "Opcional"),
    responses(
        (status = 200, description = "Nova ordem; `queue` nulo quando não há entrada para o usuário", body = QueueAdvanceResponse)
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn pass_turn(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    body: Bytes,
) -> Result<Json<QueueAdvanceResponse>, ApiError> {
    advance(app_state, locale, tenant, user, body, false).await
}

async fn advance(
    app_state: AppState,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    body: Bytes,
    attend: bool,
) -> Result<Json<QueueAdvanceResponse>, ApiError> {
    let payload = parse_advance_body(&body).map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    let caller = QueueCaller { user_id: user.0.id, professional_id: payload.professional_id };

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = if attend {
        app_state.queue_service.attend_turn(&mut *tx, tenant.0, caller).await
    } else {
        app_state.queue_service.pass_turn(&mut *tx, tenant.0, caller).await
    }
    .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(QueueAdvanceResponse::from_result(result)))
}

// POST /api/fila/entrar
#[utoipa::path(
    post,
    path = "/api/fila/entrar",
    tag = "Fila",
    request_body = JoinQueuePayload,
    responses(
        (status = 200, description = "Ordem com o profissional no fim", body = Vec<QueueEntryView>),
        (status = 404, description = "Profissional não pertence à unidade")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn join_queue(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Json(payload): Json<JoinQueuePayload>,
) -> Result<Json<Vec<QueueEntryView>>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let queue = app_state
        .queue_service
        .join(&mut *tx, tenant.0, payload.professional_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(queue))
}

// PATCH /api/fila/{professional_id}/ativo
#[utoipa::path(
    patch,
    path = "/api/fila/{professional_id}/ativo",
    tag = "Fila",
    request_body = SetActivePayload,
    responses(
        (status = 200, description = "Ordem atualizada", body = Vec<QueueEntryView>),
        (status = 404, description = "Profissional fora da fila")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("professional_id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn set_active(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(professional_id): Path<Uuid>,
    Json(payload): Json<SetActivePayload>,
) -> Result<Json<Vec<QueueEntryView>>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let queue = app_state
        .queue_service
        .set_active(&mut *tx, tenant.0, professional_id, payload.active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(queue))
}

// POST /api/fila/reset-diario
#[utoipa::path(
    post,
    path = "/api/fila/reset-diario",
    tag = "Fila",
    responses((status = 200, description = "Contadores diários zerados", body = ResetDailyResponse)),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn reset_daily(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
) -> Result<Json<ResetDailyResponse>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let reset_entries = app_state
        .queue_service
        .reset_daily(&mut *tx, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ResetDailyResponse { reset_entries }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_means_the_logged_in_professional() {
        let payload = parse_advance_body(&Bytes::new()).unwrap();
        assert!(payload.professional_id.is_none());
    }

    #[test]
    fn explicit_professional_overrides_the_caller() {
        let id = Uuid::new_v4();
        let body = Bytes::from(format!(r#"{{"professionalId":"{id}"}}"#));
        assert_eq!(parse_advance_body(&body).unwrap().professional_id, Some(id));
        assert!(parse_advance_body(&Bytes::from_static(b"{nope")).is_err());
    }
}
