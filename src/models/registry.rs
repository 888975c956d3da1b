// src/models/registry.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- CLIENTE ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    #[schema(ignore)]
    pub unidade_id: Uuid,

    #[schema(example = "João da Silva")]
    pub name: String,
    #[schema(example = "(41) 98888-7777")]
    pub phone: Option<String>,
    #[schema(example = "joao@email.com")]
    pub email: Option<String>,
    #[schema(value_type = Option<String>, format = Date, example = "1990-05-20")]
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- PROFISSIONAL ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Professional {
    pub id: Uuid,
    #[schema(ignore)]
    pub unidade_id: Uuid,

    // Login do profissional, quando ele acessa o sistema (usado pela fila)
    pub user_id: Option<Uuid>,

    #[schema(example = "Andrey")]
    pub name: String,
    #[schema(example = "Barbeiro")]
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[schema(example = "40.00")]
    pub commission_percent: Option<Decimal>,
    #[schema(example = true)]
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- PAYLOADS (criação e atualização usam o mesmo formulário) ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "João da Silva")]
    pub name: String,
    #[schema(example = "(41) 98888-7777")]
    pub phone: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    #[schema(value_type = Option<String>, format = Date, example = "1990-05-20")]
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Andrey")]
    pub name: String,
    pub user_id: Option<Uuid>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    #[schema(example = "40.00")]
    pub commission_percent: Option<Decimal>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
