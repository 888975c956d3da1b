// src/handlers/finance.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::begin_rls_transaction,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::finance::{CreateLedgerEntryPayload, GoalPayload, LedgerEntry, LedgerKind, LedgerTotals, MonthlyGoal},
    services::finance_service::parse_month,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthParams {
    /// AAAA-MM. Sem valor, o mês corrente da unidade.
    #[param(example = "2026-10")]
    pub mes: Option<String>,
    #[param(value_type = Option<String>, example = "RECEITA")]
    pub tipo: Option<LedgerKind>,
}

/// Mês pedido na query, ou o mês de hoje.
pub(crate) fn resolve_month(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_month(raw),
        None => Ok(today),
    }
}

// POST /api/financeiro/lancamentos
#[utoipa::path(
    post,
    path = "/api/financeiro/lancamentos",
    tag = "Financeiro",
    request_body = CreateLedgerEntryPayload,
    responses(
        (status = 201, description = "Lançamento criado", body = LedgerEntry),
        (status = 400, description = "Dados inválidos")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn create_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Json(payload): Json<CreateLedgerEntryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let entry = app_state
        .finance_service
        .create_entry(&mut *tx, tenant.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(entry)))
}

// GET /api/financeiro/lancamentos?mes=&tipo=
#[utoipa::path(
    get,
    path = "/api/financeiro/lancamentos",
    tag = "Financeiro",
    responses(
        (status = 200, description = "Lançamentos do mês", body = Vec<LedgerEntry>),
        (status = 400, description = "Mês inválido")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), MonthParams),
    security(("api_jwt" = []))
)]
pub async fn list_entries(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Query(params): Query<MonthParams>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let month = resolve_month(params.mes.as_deref(), app_state.clock.today())
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let entries = app_state
        .finance_service
        .list_month(&mut *tx, tenant.0, month, params.tipo)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(entries))
}

// DELETE /api/financeiro/lancamentos/{id}
#[utoipa::path(
    delete,
    path = "/api/financeiro/lancamentos/{id}",
    tag = "Financeiro",
    responses(
        (status = 204, description = "Lançamento removido"),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn delete_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .finance_service
        .delete_entry(&mut *tx, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/financeiro/totais?mes=
#[utoipa::path(
    get,
    path = "/api/financeiro/totais",
    tag = "Financeiro",
    responses(
        (status = 200, description = "Receitas e despesas do mês", body = LedgerTotals),
        (status = 400, description = "Mês inválido")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), MonthParams),
    security(("api_jwt" = []))
)]
pub async fn month_totals(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Query(params): Query<MonthParams>,
) -> Result<Json<LedgerTotals>, ApiError> {
    let month = resolve_month(params.mes.as_deref(), app_state.clock.today())
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let totals = app_state
        .finance_service
        .month_totals(&mut *tx, tenant.0, month)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(totals))
}

// PUT /api/financeiro/metas
#[utoipa::path(
    put,
    path = "/api/financeiro/metas",
    tag = "Financeiro",
    request_body = GoalPayload,
    responses(
        (status = 200, description = "Meta do mês gravada", body = MonthlyGoal),
        (status = 400, description = "Mês ou valor inválido")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn upsert_goal(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Json(payload): Json<GoalPayload>,
) -> Result<Json<MonthlyGoal>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let month = parse_month(&payload.month).map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let goal = app_state
        .finance_service
        .upsert_goal(&mut *tx, tenant.0, month, payload.target_amount)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(goal))
}

// GET /api/financeiro/metas?mes=
#[utoipa::path(
    get,
    path = "/api/financeiro/metas",
    tag = "Financeiro",
    responses((status = 200, description = "Meta do mês, ou null", body = MonthlyGoal)),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), MonthParams),
    security(("api_jwt" = []))
)]
pub async fn get_goal(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Query(params): Query<MonthParams>,
) -> Result<Json<Option<MonthlyGoal>>, ApiError> {
    let month = resolve_month(params.mes.as_deref(), app_state.clock.today())
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let goal = app_state
        .finance_service
        .get_goal(&mut *tx, tenant.0, month)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(goal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_month_falls_back_to_today() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(resolve_month(None, today).unwrap(), today);
        assert_eq!(resolve_month(Some("  "), today).unwrap(), today);
        assert_eq!(
            resolve_month(Some("2026-02"), today).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
        assert!(resolve_month(Some("fev"), today).is_err());
    }
}
