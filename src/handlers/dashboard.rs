// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid; // Importante para o Swagger params

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::finance::resolve_month,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::dashboard::DashboardSummary,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryParams {
    #[param(example = "2026-10")]
    pub mes: Option<String>,
}

// GET /api/dashboard/resumo
#[utoipa::path(
    get,
    path = "/api/dashboard/resumo",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Resumo financeiro do mês e operação do dia", body = DashboardSummary),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso à unidade")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), SummaryParams),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(params): Query<SummaryParams>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let today = app_state.clock.today();
    let month = resolve_month(params.mes.as_deref(), today)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let summary = app_state
        .dashboard_service
        .get_summary(tenant.0, user.0.id, month, today, app_state.clock.offset())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(summary))
}
