// src/handlers/units.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::units::Unit,
};

// O que o cliente precisa enviar para abrir uma unidade
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUnitPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Trato de Barbados - Centro")]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

// POST /api/unidades
#[utoipa::path(
    post,
    path = "/api/unidades",
    tag = "Unidades",
    request_body = CreateUnitPayload,
    responses(
        (status = 201, description = "Unidade criada; o usuário vira membro", body = Unit),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_unit(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateUnitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let unit = app_state
        .unit_service
        .create_unit_with_owner(payload.name.trim(), payload.address.as_deref(), payload.phone.as_deref(), user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(unit)))
}

// GET /api/unidades
#[utoipa::path(
    get,
    path = "/api/unidades",
    tag = "Unidades",
    responses((status = 200, description = "Unidades do usuário", body = Vec<Unit>)),
    security(("api_jwt" = []))
)]
pub async fn list_my_units(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Unit>>, ApiError> {
    let units = app_state
        .unit_service
        .list_user_units(user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(units))
}
