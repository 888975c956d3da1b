// src/models/units.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// Unidade (a "Barbearia")
// ---
// O tenant do sistema: cada unidade enxerga apenas os próprios dados.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    #[schema(example = "Trato de Barbados - Centro")]
    pub name: String,
    #[schema(example = "Rua XV de Novembro, 100")]
    pub address: Option<String>,
    #[schema(example = "(41) 99999-0000")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
