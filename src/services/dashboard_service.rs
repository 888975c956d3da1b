// src/services/dashboard_service.rs

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped_transaction, error::AppError},
    db::{DashboardRepository, FinanceRepository},
    models::{dashboard::DashboardSummary, finance::LedgerTotals},
    services::{appointment_service::conflict_window, finance_service::month_range},
};

/// Percentual da meta atingido, com duas casas. Sem meta (ou meta zero) não há percentual.
pub fn goal_progress(revenue: Decimal, goal: Option<Decimal>) -> Option<Decimal> {
    let goal = goal.filter(|g| !g.is_zero())?;
    Some((revenue * Decimal::ONE_HUNDRED / goal).round_dp(2))
}

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
    finance_repo: FinanceRepository,
    pool: PgPool,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository, finance_repo: FinanceRepository, pool: PgPool) -> Self {
        Self { repo, finance_repo, pool }
    }

    /// Os cards do topo. As consultas rodam em paralelo, cada uma na sua
    /// transação RLS; se qualquer uma falhar, o resumo inteiro falha.
    pub async fn get_summary(
        &self,
        unidade_id: Uuid,
        user_id: Uuid,
        month: NaiveDate,
        today: NaiveDate,
        offset: FixedOffset,
    ) -> Result<DashboardSummary, AppError> {
        let (from, to) = month_range(month)?;

        let totals = async {
            let mut tx = begin_scoped_transaction(&self.pool, unidade_id, user_id).await?;
            let totals: LedgerTotals = self.finance_repo.totals(&mut *tx, unidade_id, from, to).await?;
            tx.commit().await?;
            Ok::<_, AppError>(totals)
        };

        let goal = async {
            let mut tx = begin_scoped_transaction(&self.pool, unidade_id, user_id).await?;
            let goal = self.finance_repo.find_goal(&mut *tx, unidade_id, from).await?;
            tx.commit().await?;
            Ok::<_, AppError>(goal.map(|g| g.target_amount))
        };

        let counters = async {
            let (day_start, day_end) = conflict_window(today, None, offset)?;
            let mut tx = begin_scoped_transaction(&self.pool, unidade_id, user_id).await?;
            let appointments = self.repo.count_appointments(&mut *tx, unidade_id, day_start, day_end).await?;
            let in_queue = self.repo.count_active_in_queue(&mut *tx, unidade_id).await?;
            tx.commit().await?;
            Ok::<_, AppError>((appointments, in_queue))
        };

        let (totals, goal, (appointments_today, active_professionals_in_queue)) =
            tokio::try_join!(totals, goal, counters)?;

        Ok(DashboardSummary {
            month: from,
            revenue: totals.revenue,
            expenses: totals.expenses,
            balance: totals.revenue - totals.expenses,
            goal,
            goal_progress: goal_progress(totals.revenue, goal),
            appointments_today,
            active_professionals_in_queue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_a_percentage_with_two_decimals() {
        let progress = goal_progress(Decimal::new(1000, 0), Some(Decimal::new(3000, 0)));
        assert_eq!(progress, Some(Decimal::new(3333, 2)));
    }

    #[test]
    fn no_goal_means_no_progress() {
        assert_eq!(goal_progress(Decimal::ONE, None), None);
        assert_eq!(goal_progress(Decimal::ONE, Some(Decimal::ZERO)), None);
    }
}
