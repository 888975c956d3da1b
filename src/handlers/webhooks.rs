// src/handlers/webhooks.rs

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::Value;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::subscriptions::WebhookAck,
    services::subscription_service::SubscriptionService,
};

/// Header que o Asaas envia com o token cadastrado no painel.
pub const ASAAS_TOKEN_HEADER: &str = "asaas-access-token";

// POST /api/webhooks/asaas/{conta}
#[utoipa::path(
    post,
    path = "/api/webhooks/asaas/{conta}",
    tag = "Webhooks",
    request_body(content = Object, description = "Evento do Asaas"),
    responses(
        (status = 200, description = "Evento recebido (gravado ou repetido)", body = WebhookAck),
        (status = 400, description = "Evento malformado"),
        (status = 401, description = "Token ausente ou incorreto"),
        (status = 503, description = "Webhook não configurado")
    ),
    params(
        ("conta" = String, Path, description = "trato | andrey"),
        ("asaas-access-token" = String, Header)
    )
)]
pub async fn asaas_webhook(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(conta): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<WebhookAck>, ApiError> {
    let token = headers.get(ASAAS_TOKEN_HEADER).and_then(|v| v.to_str().ok());

    app_state
        .subscription_service
        .verify_webhook_token(token)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let account = SubscriptionService::parse_account(&conta)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ack = app_state
        .subscription_service
        .ingest_webhook(account, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ack))
}
