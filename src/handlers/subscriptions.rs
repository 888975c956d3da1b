// src/handlers/subscriptions.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::begin_rls_transaction,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::subscriptions::{
        ExternalPayment, ExternalPaymentPayload, GatewayCustomer, PaymentLink, RegisterPaymentPayload,
        SubscriberListResponse,
    },
    services::subscription_service::SubscriptionService,
};

// GET /api/assinaturas
#[utoipa::path(
    get,
    path = "/api/assinaturas",
    tag = "Assinaturas",
    responses(
        (status = 200, description = "Lista unificada (Trato, Andrey e externos) com status calculado", body = SubscriberListResponse)
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn list_subscribers(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    user: AuthenticatedUser,
) -> Json<SubscriberListResponse> {
    // Fonte fora do ar não derruba a lista: vem em `unavailableSources`
    let response = app_state
        .subscription_service
        .list_subscribers(tenant.0, user.0.id, app_state.clock.today())
        .await;

    Json(response)
}

// GET /api/assinaturas/gateway/{conta}/ativos
#[utoipa::path(
    get,
    path = "/api/assinaturas/gateway/{conta}/ativos",
    tag = "Assinaturas",
    responses(
        (status = 200, description = "Clientes com assinatura ativa na conta", body = Vec<GatewayCustomer>),
        (status = 400, description = "Conta desconhecida"),
        (status = 502, description = "Falha no gateway"),
        (status = 503, description = "Conta sem credenciais")
    ),
    params(
        ("x-unidade-id" = Uuid, Header, description = "ID da Unidade"),
        ("conta" = String, Path, description = "trato | andrey")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_active_gateway_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(conta): Path<String>,
) -> Result<Json<Vec<GatewayCustomer>>, ApiError> {
    let account = SubscriptionService::parse_account(&conta)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let customers = app_state
        .subscription_service
        .active_gateway_customers(account, app_state.clock.today())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(customers))
}

// POST /api/assinaturas/gateway/{conta}/{subscription_id}/cancelar
#[utoipa::path(
    post,
    path = "/api/assinaturas/gateway/{conta}/{subscription_id}/cancelar",
    tag = "Assinaturas",
    responses(
        (status = 204, description = "Assinatura cancelada no gateway"),
        (status = 404, description = "Assinatura não encontrada no gateway"),
        (status = 502, description = "Falha no gateway")
    ),
    params(
        ("x-unidade-id" = Uuid, Header, description = "ID da Unidade"),
        ("conta" = String, Path, description = "trato | andrey"),
        ("subscription_id" = String, Path)
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_gateway_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((conta, subscription_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let account = SubscriptionService::parse_account(&conta)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .subscription_service
        .cancel_gateway_subscription(account, &subscription_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/assinaturas/gateway/{conta}/links/{link_id}
#[utoipa::path(
    get,
    path = "/api/assinaturas/gateway/{conta}/links/{link_id}",
    tag = "Assinaturas",
    responses(
        (status = 200, description = "Link de pagamento, ou null quando não existe", body = PaymentLink),
        (status = 502, description = "Falha no gateway")
    ),
    params(
        ("x-unidade-id" = Uuid, Header, description = "ID da Unidade"),
        ("conta" = String, Path, description = "trato | andrey"),
        ("link_id" = String, Path)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_payment_link(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((conta, link_id)): Path<(String, String)>,
) -> Result<Json<Option<PaymentLink>>, ApiError> {
    let account = SubscriptionService::parse_account(&conta)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let link = app_state
        .subscription_service
        .payment_link(account, &link_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(link))
}

// =============================================================================
//  PAGAMENTOS EXTERNOS
// =============================================================================

// POST /api/assinaturas/externos
#[utoipa::path(
    post,
    path = "/api/assinaturas/externos",
    tag = "Assinaturas",
    request_body = ExternalPaymentPayload,
    responses(
        (status = 201, description = "Pagamento externo cadastrado", body = ExternalPayment),
        (status = 400, description = "Dados inválidos")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn create_external(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Json(payload): Json<ExternalPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payment = app_state
        .subscription_service
        .create_external(&mut *tx, tenant.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(payment)))
}

// GET /api/assinaturas/externos
#[utoipa::path(
    get,
    path = "/api/assinaturas/externos",
    tag = "Assinaturas",
    responses((status = 200, description = "Pagamentos externos da unidade", body = Vec<ExternalPayment>)),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade")),
    security(("api_jwt" = []))
)]
pub async fn list_external(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ExternalPayment>>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payments = app_state
        .subscription_service
        .list_external(&mut *tx, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payments))
}

// POST /api/assinaturas/externos/{id}/pagamento
#[utoipa::path(
    post,
    path = "/api/assinaturas/externos/{id}/pagamento",
    tag = "Assinaturas",
    request_body = RegisterPaymentPayload,
    responses(
        (status = 200, description = "Pagamento registrado", body = ExternalPayment),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn register_external_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RegisterPaymentPayload>,
) -> Result<Json<ExternalPayment>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payment = app_state
        .subscription_service
        .register_external_payment(&mut *tx, tenant.0, id, &payload, app_state.clock.today())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payment))
}

// POST /api/assinaturas/externos/{id}/cancelar
#[utoipa::path(
    post,
    path = "/api/assinaturas/externos/{id}/cancelar",
    tag = "Assinaturas",
    responses(
        (status = 200, description = "Pagamento externo cancelado", body = ExternalPayment),
        (status = 404, description = "Não encontrado")
    ),
    params(("x-unidade-id" = Uuid, Header, description = "ID da Unidade"), ("id" = Uuid, Path)),
    security(("api_jwt" = []))
)]
pub async fn cancel_external(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ExternalPayment>, ApiError> {
    let mut tx = begin_rls_transaction(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payment = app_state
        .subscription_service
        .cancel_external(&mut *tx, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payment))
}
