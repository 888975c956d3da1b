// src/services/finance_service.rs

use chrono::{Datelike, Months, NaiveDate};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::FinanceRepository,
    models::finance::{CreateLedgerEntryPayload, LedgerEntry, LedgerKind, LedgerTotals, MonthlyGoal},
};

/// "2026-10" -> 2026-10-01. Formato inválido é erro do cliente.
pub fn parse_month(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidPayload(format!("mês inválido: '{}' (use AAAA-MM)", raw)))
}

/// Intervalo `[primeiro dia, primeiro dia do mês seguinte)`.
pub fn month_range(any_day: NaiveDate) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = any_day.with_day(1).ok_or(AppError::InvalidTimeRange)?;
    let next = first.checked_add_months(Months::new(1)).ok_or(AppError::InvalidTimeRange)?;
    Ok((first, next))
}

#[derive(Clone)]
pub struct FinanceService {
    repo: FinanceRepository,
}

impl FinanceService {
    pub fn new(repo: FinanceRepository) -> Self {
        Self { repo }
    }

    pub async fn create_entry<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        payload: &CreateLedgerEntryPayload,
    ) -> Result<LedgerEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .create_entry(
                executor,
                unidade_id,
                payload.kind,
                payload.category.trim(),
                payload.description.as_deref(),
                payload.amount,
                payload.competence_date,
                payload.professional_id,
                payload.client_id,
            )
            .await
    }

    pub async fn list_month<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        month: NaiveDate,
        kind: Option<LedgerKind>,
    ) -> Result<Vec<LedgerEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (from, to) = month_range(month)?;
        self.repo.list_entries(executor, unidade_id, from, to, kind).await
    }

    pub async fn delete_entry<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.repo.delete_entry(executor, unidade_id, id).await? {
            return Err(AppError::NotFound("ledger_entry"));
        }
        Ok(())
    }

    pub async fn month_totals<'e, E>(&self, executor: E, unidade_id: Uuid, month: NaiveDate) -> Result<LedgerTotals, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (from, to) = month_range(month)?;
        self.repo.totals(executor, unidade_id, from, to).await
    }

    // =========================================================================
    //  METAS
    // =========================================================================

    pub async fn upsert_goal<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        month: NaiveDate,
        target_amount: rust_decimal::Decimal,
    ) -> Result<MonthlyGoal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (first, _) = month_range(month)?;
        self.repo.upsert_goal(executor, unidade_id, first, target_amount).await
    }

    /// Meta do mês; ausência não é erro.
    pub async fn get_goal<'e, E>(&self, executor: E, unidade_id: Uuid, month: NaiveDate) -> Result<Option<MonthlyGoal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (first, _) = month_range(month)?;
        self.repo.find_goal(executor, unidade_id, first).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_month() {
        assert_eq!(parse_month("2026-10").unwrap(), NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert!(matches!(parse_month("10/2026"), Err(AppError::InvalidPayload(_))));
        assert!(parse_month("2026-13").is_err());
    }

    #[test]
    fn december_rolls_into_next_year() {
        let (from, to) = month_range(NaiveDate::from_ymd_opt(2026, 12, 25).unwrap()).unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }
}
