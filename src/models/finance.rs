// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::subscriptions::positive_amount;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ledger_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerKind {
    Receita, // Entrada
    Despesa, // Saída
}

// --- Structs ---

// Linha de `lancamentos_financeiros`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,

    #[schema(ignore)]
    pub unidade_id: Uuid,

    pub kind: LedgerKind,

    #[schema(example = "Serviços")]
    pub category: String,

    #[schema(example = "Corte - João da Silva")]
    pub description: Option<String>,

    #[schema(example = "45.00")]
    pub amount: Decimal,

    #[schema(value_type = String, format = Date, example = "2026-10-16")]
    pub competence_date: NaiveDate,

    // Vínculos opcionais
    pub professional_id: Option<Uuid>,
    pub client_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

// Linha de `metas`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyGoal {
    pub id: Uuid,

    #[schema(ignore)]
    pub unidade_id: Uuid,

    // Sempre o primeiro dia do mês
    #[schema(value_type = String, format = Date, example = "2026-10-01")]
    pub month: NaiveDate,

    #[schema(example = "30000.00")]
    pub target_amount: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Totais do mês, calculados no banco
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTotals {
    pub revenue: Decimal,
    pub expenses: Decimal,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLedgerEntryPayload {
    pub kind: LedgerKind,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Serviços")]
    pub category: String,
    pub description: Option<String>,
    #[validate(custom(function = "positive_amount", message = "invalid_amount"))]
    #[schema(example = "45.00")]
    pub amount: Decimal,
    #[schema(value_type = String, format = Date, example = "2026-10-16")]
    pub competence_date: NaiveDate,
    pub professional_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalPayload {
    // "YYYY-MM"
    #[schema(example = "2026-10")]
    pub month: String,
    #[validate(custom(function = "non_negative", message = "invalid_amount"))]
    #[schema(example = "30000.00")]
    pub target_amount: Decimal,
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("invalid_amount"));
    }
    Ok(())
}
