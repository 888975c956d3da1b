// src/db/finance_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::finance::{LedgerEntry, LedgerKind, LedgerTotals, MonthlyGoal},
};

#[derive(Clone, Default)]
pub struct FinanceRepository;

impl FinanceRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  LANÇAMENTOS
    // =========================================================================

    pub async fn create_entry<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        kind: LedgerKind,
        category: &str,
        description: Option<&str>,
        amount: Decimal,
        competence_date: NaiveDate,
        professional_id: Option<Uuid>,
        client_id: Option<Uuid>,
    ) -> Result<LedgerEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"
            INSERT INTO lancamentos_financeiros (
                unidade_id, kind, category, description, amount,
                competence_date, professional_id, client_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(kind)
        .bind(category)
        .bind(description)
        .bind(amount)
        .bind(competence_date)
        .bind(professional_id)
        .bind(client_id)
        .fetch_one(executor)
        .await?;

        Ok(entry)
    }

    /// Lançamentos com competência em `[from, to)`.
    pub async fn list_entries<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        kind: Option<LedgerKind>,
    ) -> Result<Vec<LedgerEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT * FROM lancamentos_financeiros
            WHERE unidade_id = $1
              AND competence_date >= $2
              AND competence_date < $3
              AND ($4::ledger_kind IS NULL OR kind = $4)
            ORDER BY competence_date DESC, created_at DESC
            "#,
        )
        .bind(unidade_id)
        .bind(from)
        .bind(to)
        .bind(kind)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }

    pub async fn delete_entry<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM lancamentos_financeiros WHERE unidade_id = $1 AND id = $2")
            .bind(unidade_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Somatório de receitas e despesas no intervalo
    pub async fn totals<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<LedgerTotals, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, LedgerTotals>(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE kind = 'RECEITA'), 0) AS revenue,
                COALESCE(SUM(amount) FILTER (WHERE kind = 'DESPESA'), 0) AS expenses
            FROM lancamentos_financeiros
            WHERE unidade_id = $1
              AND competence_date >= $2
              AND competence_date < $3
            "#,
        )
        .bind(unidade_id)
        .bind(from)
        .bind(to)
        .fetch_one(executor)
        .await?;

        Ok(totals)
    }

    // =========================================================================
    //  METAS
    // =========================================================================

    pub async fn upsert_goal<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        month: NaiveDate,
        target_amount: Decimal,
    ) -> Result<MonthlyGoal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let goal = sqlx::query_as::<_, MonthlyGoal>(
            r#"
            INSERT INTO metas (unidade_id, month, target_amount)
            VALUES ($1, $2, $3)
            ON CONFLICT (unidade_id, month)
            DO UPDATE SET target_amount = EXCLUDED.target_amount, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(month)
        .bind(target_amount)
        .fetch_one(executor)
        .await?;

        Ok(goal)
    }

    pub async fn find_goal<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        month: NaiveDate,
    ) -> Result<Option<MonthlyGoal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let goal = sqlx::query_as::<_, MonthlyGoal>("SELECT * FROM metas WHERE unidade_id = $1 AND month = $2")
            .bind(unidade_id)
            .bind(month)
            .fetch_optional(executor)
            .await?;
        Ok(goal)
    }
}
