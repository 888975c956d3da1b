// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::services::gateway::GatewayError;

// Erros de domínio e de infraestrutura. Não carregam status HTTP:
// a tradução para o envelope JSON acontece em `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Acesso negado à unidade")]
    UnitAccessDenied,

    #[error("Registro não encontrado: {0}")]
    NotFound(&'static str),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Conflito de agenda com {} agendamento(s)", .0.len())]
    ScheduleConflict(Vec<Uuid>),

    #[error("Intervalo de horário inválido")]
    InvalidTimeRange,

    #[error("Conteúdo inválido: {0}")]
    InvalidPayload(String),

    #[error("Token de recuperação inválido ou expirado")]
    InvalidResetToken,

    #[error("Conta de gateway desconhecida: {0}")]
    UnknownGatewayAccount(String),

    #[error("Gateway não configurado para a conta {0}")]
    GatewayNotConfigured(String),

    #[error("Erro no gateway de pagamento: {0}")]
    Gateway(#[from] GatewayError),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O envelope que sai na resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    /// Chave de tradução usada no `I18nStore`.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::UserNotFound => "user_not_found",
            AppError::UnitAccessDenied => "unit_access_denied",
            AppError::NotFound(_) => "not_found",
            AppError::UniqueConstraintViolation(_) => "unique_violation",
            AppError::ScheduleConflict(_) => "schedule_conflict",
            AppError::InvalidTimeRange => "invalid_time_range",
            AppError::InvalidPayload(_) => "invalid_payload",
            AppError::InvalidResetToken => "invalid_reset_token",
            AppError::UnknownGatewayAccount(_) => "unknown_gateway_account",
            AppError::GatewayNotConfigured(_) => "gateway_not_configured",
            AppError::Gateway(GatewayError::Unauthorized) => "gateway_unauthorized",
            AppError::Gateway(GatewayError::NotFound) => "not_found",
            AppError::Gateway(_) => "gateway_error",
            _ => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidTimeRange
            | AppError::InvalidPayload(_)
            | AppError::InvalidResetToken
            | AppError::UnknownGatewayAccount(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::Gateway(GatewayError::Unauthorized) => StatusCode::UNAUTHORIZED,
            AppError::UnitAccessDenied => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::NotFound(_) | AppError::Gateway(GatewayError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            AppError::EmailAlreadyExists
            | AppError::UniqueConstraintViolation(_)
            | AppError::ScheduleConflict(_) => StatusCode::CONFLICT,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte o erro no envelope HTTP, traduzindo a mensagem para o idioma do cliente.
    /// Erros 5xx têm a causa original apenas logada.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        let key = self.message_key();

        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let code = e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string());
                            Value::String(store.translate(&locale.0, &code))
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(details))
            }
            AppError::NotFound(entity) => Some(json!({ "entity": entity })),
            AppError::UniqueConstraintViolation(detail) | AppError::InvalidPayload(detail) => {
                Some(json!({ "detail": detail }))
            }
            AppError::ScheduleConflict(ids) => Some(json!({ "conflictingAppointments": ids })),
            AppError::UnknownGatewayAccount(account) | AppError::GatewayNotConfigured(account) => {
                Some(json!({ "account": account }))
            }
            _ => None,
        };

        ApiError {
            status,
            error: store.translate(&locale.0, key),
            details,
        }
    }
}

/// Converte violação de chave única no erro amigável; o resto vira erro de banco.
pub fn map_unique_violation(e: sqlx::Error, detail: impl FnOnce() -> String) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(detail());
        }
    }
    AppError::DatabaseError(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "required"))]
        name: String,
    }

    fn pt() -> Locale {
        Locale("pt".to_string())
    }

    #[test]
    fn validation_errors_become_400_with_field_details() {
        let errors = Payload { name: String::new() }.validate().unwrap_err();
        let api = AppError::ValidationError(errors).to_api_error(&pt(), &I18nStore::new());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        assert_eq!(details["name"][0], "Campo obrigatório.");
    }

    #[test]
    fn gateway_auth_failure_is_401_and_other_gateway_errors_are_5xx() {
        let store = I18nStore::new();
        let unauthorized = AppError::Gateway(GatewayError::Unauthorized).to_api_error(&pt(), &store);
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);

        let upstream = AppError::Gateway(GatewayError::Status { status: 500, body: "boom".into() })
            .to_api_error(&pt(), &store);
        assert!(upstream.status.is_server_error());
        assert!(!upstream.error.contains("boom"));
    }

    #[test]
    fn database_errors_hide_the_cause() {
        let api = AppError::DatabaseError(sqlx::Error::PoolTimedOut).to_api_error(&pt(), &I18nStore::new());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "Ocorreu um erro inesperado.");
        assert!(api.details.is_none());
    }

    #[test]
    fn schedule_conflict_lists_the_conflicting_ids() {
        let id = Uuid::new_v4();
        let api = AppError::ScheduleConflict(vec![id]).to_api_error(&pt(), &I18nStore::new());
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.details.unwrap()["conflictingAppointments"][0], id.to_string());
    }
}
