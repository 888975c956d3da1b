// src/handlers/appointments.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
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
    models::appointments::{
        Appointment, ConflictCheckResponse, CreateAppointmentPayload, ReschedulePayload, UpdateStatusPayload,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ConflictParams {
    /// Dia da consulta (AAAA-MM-DD)
    #[param(value_type = String, format = Date)]
    pub data: NaiveDate,
    /// Ids separados por vírgula. Vazio desabilita a consulta.
    pub resource_ids: Option<String>,
    #[param(value_type = Option<String>, example = "09:00")]
    pub inicio: Option<NaiveTime>,
    #[param(value_type = Option<String>, example = "10:00")]
    pub fim: Option<NaiveTime>,
}

impl ConflictParams {
    pub fn resource_ids(&self) -> Result<Vec<Uuid>, AppError> {
        self.resource_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Uuid::parse_str(s).map_err(|_| AppError::InvalidPayload(format!("resourceIds: '{}' não é UUID", s))))
            .collect()
    }

    /// Só um dos horários informado: o outro vira o limite do dia.
    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.inicio, self.fim) {
            (None, None) => None,
            (start, end) => Some((
                start.unwrap_or(NaiveTime::MIN),
                end.unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)),
            )),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DayParams {
    /// Sem data, usa o dia de hoje da unidade
    #[param(value_type = Option<String>, format = Date)]
    pub data: Option<NaiveDate>,
}

// GET /api/agendamentos/conflitos
#[utoipa::path(
    get,
    path = "/api/agendamentos/conflitos",
    tag = "Agendamentos",
    responses(
        (status = 200, description = "Agendamentos em conflito", body = ConflictCheckResponse),
        (status = 400, description = "Janela ou ids inválidos")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ConflictParams),
    security(("api_jwt" = []))
)]
pub async fn check_conflicts(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Query(params): Query<ConflictParams>,
) -> Result<Json<ConflictCheckResponse>, ApiError> {
    let resource_ids = params
        .resource_ids()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .appointment_service
        .check_conflicts(
            &mut *tx,
            tenant.0,
            params.data,
            &resource_ids,
            params.window(),
            app_state.clock.offset(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

// POST /api/agendamentos
#[utoipa::path(
    post,
    path = "/api/agendamentos",
    tag = "Agendamentos",
    request_body = CreateAppointmentPayload,
    responses(
        (status = 201, description = "Agendamento criado", body = Appointment),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Conflito de horário com outro agendamento")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn create_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Json(payload): Json<CreateAppointmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let appointment = app_state
        .appointment_service
        .create(&mut *tx, tenant.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

// GET /api/agendamentos?data=
#[utoipa::path(
    get,
    path = "/api/agendamentos",
    tag = "Agendamentos",
    responses((status = 200, description = "Agenda do dia", body = Vec<Appointment>)),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), DayParams),
    security(("api_jwt" = []))
)]
pub async fn list_appointments(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Query(params): Query<DayParams>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let date = params.data.unwrap_or_else(|| app_state.clock.today());

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let appointments = app_state
        .appointment_service
        .list_day(&mut *tx, tenant.0, date, app_state.clock.offset())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(appointments))
}

// PATCH /api/agendamentos/{id}/status
#[utoipa::path(
    patch,
    path = "/api/agendamentos/{id}/status",
    tag = "Agendamentos",
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Appointment),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<Appointment>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let appointment = app_state
        .appointment_service
        .update_status(&mut *tx, tenant.0, id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(appointment))
}

// PUT /api/agendamentos/{id}/horario
#[utoipa::path(
    put,
    path = "/api/agendamentos/{id}/horario",
    tag = "Agendamentos",
    request_body = ReschedulePayload,
    responses(
        (status = 200, description = "Horário alterado", body = Appointment),
        (status = 404, description = "Não encontrado"),
        (status = 409, description = "Conflito de horário com outro agendamento")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn reschedule(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<Json<Appointment>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let appointment = app_state
        .appointment_service
        .reschedule(&mut *tx, tenant.0, id, payload.start_at, payload.end_at)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(appointment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(resource_ids: Option<&str>) -> ConflictParams {
        ConflictParams {
            data: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            resource_ids: resource_ids.map(str::to_string),
            inicio: None,
            fim: None,
        }
    }

    #[test]
    fn blank_resource_list_parses_to_empty() {
        assert!(params(None).resource_ids().unwrap().is_empty());
        assert!(params(Some(" , ")).resource_ids().unwrap().is_empty());
    }

    #[test]
    fn resource_ids_are_comma_separated_uuids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let parsed = params(Some(&format!("{a}, {b}"))).resource_ids().unwrap();
        assert_eq!(parsed, vec![a, b]);
        assert!(matches!(params(Some("abc")).resource_ids(), Err(AppError::InvalidPayload(_))));
    }

    #[test]
    fn half_open_window_is_completed_with_day_limits() {
        let mut p = params(None);
        assert!(p.window().is_none());

        p.inicio = NaiveTime::from_hms_opt(14, 0, 0);
        let (start, end) = p.window().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }
}
