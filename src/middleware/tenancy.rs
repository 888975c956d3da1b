// src/middleware/tenancy.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
};

// O nome do nosso cabeçalho HTTP customizado
pub const UNIDADE_ID_HEADER: &str = "x-unidade-id";

// A unidade que o usuário quer acessar nesta requisição
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

#[derive(Debug, PartialEq, Eq)]
pub enum UnitHeaderError {
    Missing,
    Invalid,
}

impl UnitHeaderError {
    fn message_key(&self) -> &'static str {
        match self {
            UnitHeaderError::Missing => "missing_unit_header",
            UnitHeaderError::Invalid => "invalid_unit_header",
        }
    }
}

pub fn parse_unit_header(headers: &HeaderMap) -> Result<Uuid, UnitHeaderError> {
    let value = headers.get(UNIDADE_ID_HEADER).ok_or(UnitHeaderError::Missing)?;
    let value_str = value.to_str().map_err(|_| UnitHeaderError::Invalid)?;
    Uuid::parse_str(value_str.trim()).map_err(|_| UnitHeaderError::Invalid)
}

/// Roda depois do `auth_guard`: lê o `x-unidade-id`, confere se o usuário
/// é membro da unidade e guarda o contexto nas extensions.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers());

    let unidade_id = parse_unit_header(request.headers()).map_err(|e| {
        ApiError::new(StatusCode::BAD_REQUEST, app_state.i18n_store.translate(&locale.0, e.message_key()))
    })?;

    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

    let is_member = app_state
        .unit_service
        .is_member(user.0.id, unidade_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    if !is_member {
        tracing::warn!("Usuário {} tentou acessar a unidade {} sem vínculo", user.0.id, unidade_id);
        return Err(AppError::UnitAccessDenied.to_api_error(&locale, &app_state.i18n_store));
    }

    request.extensions_mut().insert(TenantContext(unidade_id));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Contexto da unidade não encontrado"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn unit_header_must_be_a_uuid() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_unit_header(&headers), Err(UnitHeaderError::Missing));

        headers.insert(UNIDADE_ID_HEADER, HeaderValue::from_static("loja-1"));
        assert_eq!(parse_unit_header(&headers), Err(UnitHeaderError::Invalid));

        let id = Uuid::new_v4();
        headers.insert(UNIDADE_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(parse_unit_header(&headers), Ok(id));
    }
}
