// src/models/subscriptions.rs

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// =============================================================================
//  FONTES DE ASSINATURA
// =============================================================================

/// As duas contas independentes no Asaas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GatewayAccount {
    Trato,
    Andrey,
}

impl GatewayAccount {
    pub const ALL: [GatewayAccount; 2] = [GatewayAccount::Trato, GatewayAccount::Andrey];

    pub fn env_suffix(self) -> &'static str {
        match self {
            GatewayAccount::Trato => "TRATO",
            GatewayAccount::Andrey => "ANDREY",
        }
    }

    pub fn source(self) -> SubscriptionSource {
        match self {
            GatewayAccount::Trato => SubscriptionSource::AsaasTrato,
            GatewayAccount::Andrey => SubscriptionSource::AsaasAndrey,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GatewayAccount::Trato => "trato",
            GatewayAccount::Andrey => "andrey",
        }
    }
}

impl FromStr for GatewayAccount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trato" => Ok(GatewayAccount::Trato),
            "andrey" => Ok(GatewayAccount::Andrey),
            other => Err(other.to_string()),
        }
    }
}

// Etiqueta de origem de cada linha da lista unificada
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionSource {
    AsaasTrato,
    AsaasAndrey,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriberStatus {
    Ativo,
    Atrasado,
    Cancelado,
}

// =============================================================================
//  REGRA DE STATUS (parametrizada)
// =============================================================================

/// Como comparar "dias desde a data de referência" com o limite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonMode {
    /// Ativo enquanto `dias <= limite`.
    AtMost,
    /// Ativo enquanto `dias < limite`.
    LessThan,
}

impl FromStr for ComparisonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "at_most" | "lte" => Ok(ComparisonMode::AtMost),
            "less_than" | "lt" => Ok(ComparisonMode::LessThan),
            other => Err(format!("modo de comparação desconhecido: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRule {
    pub threshold_days: i64,
    pub mode: ComparisonMode,
}

impl StatusRule {
    pub const fn new(threshold_days: i64, mode: ComparisonMode) -> Self {
        Self { threshold_days, mode }
    }
}

// =============================================================================
//  GATEWAY (formato exposto pela API, montado a partir do Asaas)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySubscription {
    #[schema(example = "sub_VXJBYgP2u0eO")]
    pub id: String,
    #[serde(default)]
    pub customer: String,
    #[schema(example = "89.90")]
    pub value: Decimal,
    #[schema(value_type = String, format = Date, example = "2026-10-15")]
    pub next_due_date: NaiveDate,
    #[serde(default)]
    #[schema(example = "MONTHLY")]
    pub cycle: Option<String>,
    #[schema(example = "ACTIVE")]
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl GatewaySubscription {
    pub fn is_cancelled(&self) -> bool {
        self.deleted || self.status != "ACTIVE"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCustomer {
    #[schema(example = "cus_000005219613")]
    pub id: String,
    #[schema(example = "Carlos Souza")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub cpf_cnpj: Option<String>,
    // Ordenadas: ativas primeiro. `subscriptions[0]` define o status.
    #[serde(default)]
    pub subscriptions: Vec<GatewaySubscription>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    #[schema(example = "725104409743")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub active: bool,
    pub url: String,
    #[serde(default)]
    pub charge_type: Option<String>,
    #[serde(default)]
    pub billing_type: Option<String>,
    #[serde(default)]
    pub subscription_cycle: Option<String>,
}

// Evento recebido no webhook do Asaas
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AsaasWebhookEvent {
    #[schema(example = "evt_05b708f961d739ea7eba7e4db318f621")]
    pub id: String,
    #[schema(example = "PAYMENT_RECEIVED")]
    pub event: String,
    #[serde(default)]
    pub payment: Option<AsaasPayment>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AsaasPayment {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub payment_date: Option<NaiveDate>,
}

// Linha de `pagamentos_asaas`
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPaymentRecord {
    pub id: Uuid,
    pub account: String,
    pub event_id: String,
    pub event: String,
    pub payment_id: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub amount: Option<Decimal>,
    pub status: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub payment_date: Option<NaiveDate>,
    #[schema(value_type = Object)]
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
//  PAGAMENTOS EXTERNOS (controle manual)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPayment {
    pub id: Uuid,
    #[schema(ignore)]
    pub unidade_id: Uuid,
    #[schema(example = "Marcos Lima")]
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    #[schema(example = "79.90")]
    pub amount: Decimal,
    #[schema(example = "PIX")]
    pub payment_method: Option<String>,
    #[schema(value_type = String, format = Date, example = "2026-09-20")]
    pub last_payment_date: NaiveDate,
    pub cancelled: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPaymentPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Marcos Lima")]
    pub client_name: String,
    #[validate(email(message = "invalid_email"))]
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    #[validate(custom(function = "positive_amount", message = "invalid_amount"))]
    #[schema(example = "79.90")]
    pub amount: Decimal,
    #[schema(example = "PIX")]
    pub payment_method: Option<String>,
    #[schema(value_type = String, format = Date, example = "2026-09-20")]
    pub last_payment_date: NaiveDate,
    pub notes: Option<String>,
}

// Registro de um novo pagamento. Sem data, vale o dia de hoje.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPaymentPayload {
    #[schema(value_type = Option<String>, format = Date)]
    pub payment_date: Option<NaiveDate>,
    #[validate(custom(function = "positive_amount", message = "invalid_amount"))]
    pub amount: Option<Decimal>,
    pub payment_method: Option<String>,
}

pub fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_amount"))
    }
}

// =============================================================================
//  LISTA UNIFICADA
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberRow {
    pub source: SubscriptionSource,
    // id do cliente no Asaas ou id (UUID) do pagamento externo
    pub id: String,
    pub subscription_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub value: Decimal,
    // nextDueDate (gateway) ou lastPaymentDate (externo)
    #[schema(value_type = String, format = Date)]
    pub reference_date: NaiveDate,
    pub days_since_reference: i64,
    pub status: SubscriberStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberListResponse {
    pub subscribers: Vec<SubscriberRow>,
    // Fontes que falharam e vieram vazias
    pub unavailable_sources: Vec<SubscriptionSource>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    // false quando o evento já tinha sido gravado antes
    pub stored: bool,
}
