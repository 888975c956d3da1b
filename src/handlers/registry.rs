// src/handlers/registry.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
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
    models::registry::{Client, ClientPayload, Professional, ProfessionalPayload},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClientSearch {
    /// Parte do nome, telefone ou e-mail
    pub q: Option<String>,
}

// =============================================================================
//  CLIENTES
// =============================================================================

// POST /api/clientes
#[utoipa::path(
    post,
    path = "/api/clientes",
    tag = "Clientes",
    request_body = ClientPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Client),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Telefone já cadastrado na unidade")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let client = app_state
        .registry_service
        .create_client(&mut *tx, tenant.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(client)))
}

// GET /api/clientes?q=
#[utoipa::path(
    get,
    path = "/api/clientes",
    tag = "Clientes",
    responses((status = 200, description = "Clientes da unidade", body = Vec<Client>)),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ClientSearch),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Query(search): Query<ClientSearch>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let clients = app_state
        .registry_service
        .list_clients(&mut *tx, tenant.0, search.q.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(clients))
}

// GET /api/clientes/{id}
#[utoipa::path(
    get,
    path = "/api/clientes/{id}",
    tag = "Clientes",
    responses(
        (status = 200, description = "Cliente", body = Client),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let client = app_state
        .registry_service
        .get_client(&mut *tx, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(client))
}

// PUT /api/clientes/{id}
#[utoipa::path(
    put,
    path = "/api/clientes/{id}",
    tag = "Clientes",
    request_body = ClientPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = Client),
        (status = 404, description = "Não encontrado"),
        (status = 409, description = "Telefone já cadastrado na unidade")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientPayload>,
) -> Result<Json<Client>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let client = app_state
        .registry_service
        .update_client(&mut *tx, tenant.0, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(client))
}

// DELETE /api/clientes/{id}
#[utoipa::path(
    delete,
    path = "/api/clientes/{id}",
    tag = "Clientes",
    responses(
        (status = 204, description = "Removido"),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn delete_client(
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
        .registry_service
        .delete_client(&mut *tx, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  PROFISSIONAIS
// =============================================================================

// POST /api/profissionais
#[utoipa::path(
    post,
    path = "/api/profissionais",
    tag = "Profissionais",
    request_body = ProfessionalPayload,
    responses(
        (status = 201, description = "Profissional criado", body = Professional),
        (status = 400, description = "Dados inválidos")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn create_professional(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Json(payload): Json<ProfessionalPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let professional = app_state
        .registry_service
        .create_professional(&mut *tx, tenant.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(professional)))
}

// GET /api/profissionais
#[utoipa::path(
    get,
    path = "/api/profissionais",
    tag = "Profissionais",
    responses((status = 200, description = "Profissionais da unidade", body = Vec<Professional>)),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn list_professionals(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Professional>>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let professionals = app_state
        .registry_service
        .list_professionals(&mut *tx, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(professionals))
}

// GET /api/profissionais/{id}
#[utoipa::path(
    get,
    path = "/api/profissionais/{id}",
    tag = "Profissionais",
    responses(
        (status = 200, description = "Profissional", body = Professional),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn get_professional(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Professional>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let professional = app_state
        .registry_service
        .get_professional(&mut *tx, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(professional))
}

// PUT /api/profissionais/{id}
#[utoipa::path(
    put,
    path = "/api/profissionais/{id}",
    tag = "Profissionais",
    request_body = ProfessionalPayload,
    responses(
        (status = 200, description = "Profissional atualizado", body = Professional),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn update_professional(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProfessionalPayload>,
) -> Result<Json<Professional>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let professional = app_state
        .registry_service
        .update_professional(&mut *tx, tenant.0, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(professional))
}

// DELETE /api/profissionais/{id}
#[utoipa::path(
    delete,
    path = "/api/profissionais/{id}",
    tag = "Profissionais",
    responses(
        (status = 204, description = "Removido"),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn delete_professional(
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
        .registry_service
        .delete_professional(&mut *tx, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
