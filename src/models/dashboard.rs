// src/models/dashboard.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

// Resumo do mês (os cards do topo)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[schema(value_type = String, format = Date, example = "2026-10-01")]
    pub month: NaiveDate,
    pub revenue: Decimal,         // Receitas lançadas no mês
    pub expenses: Decimal,        // Despesas lançadas no mês
    pub balance: Decimal,         // Receitas - Despesas
    pub goal: Option<Decimal>,    // Meta do mês, se cadastrada
    pub goal_progress: Option<Decimal>, // % da meta atingida (2 casas)
    pub appointments_today: i64,
    pub active_professionals_in_queue: i64,
}
