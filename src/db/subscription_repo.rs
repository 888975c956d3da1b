// src/db/subscription_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::subscriptions::{AsaasWebhookEvent, ExternalPayment, GatewayAccount, GatewayPaymentRecord},
};

// `external_payments` (por unidade, RLS) e `pagamentos_asaas` (global).
#[derive(Clone)]
pub struct ExternalPaymentRepository {
    pool: PgPool,
}

impl ExternalPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        client_name: &str,
        client_email: Option<&str>,
        client_phone: Option<&str>,
        amount: Decimal,
        payment_method: Option<&str>,
        last_payment_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<ExternalPayment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, ExternalPayment>(
            r#"
            INSERT INTO external_payments (
                unidade_id, client_name, client_email, client_phone,
                amount, payment_method, last_payment_date, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(client_name)
        .bind(client_email)
        .bind(client_phone)
        .bind(amount)
        .bind(payment_method)
        .bind(last_payment_date)
        .bind(notes)
        .fetch_one(executor)
        .await?;

        Ok(payment)
    }

    pub async fn list<'e, E>(&self, executor: E, unidade_id: Uuid) -> Result<Vec<ExternalPayment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payments = sqlx::query_as::<_, ExternalPayment>(
            "SELECT * FROM external_payments WHERE unidade_id = $1 ORDER BY client_name ASC",
        )
        .bind(unidade_id)
        .fetch_all(executor)
        .await?;
        Ok(payments)
    }

    /// Novo pagamento recebido: avança a data e reativa o registro.
    pub async fn register_payment<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
        payment_date: NaiveDate,
        amount: Option<Decimal>,
        payment_method: Option<&str>,
    ) -> Result<Option<ExternalPayment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, ExternalPayment>(
            r#"
            UPDATE external_payments
            SET last_payment_date = GREATEST(last_payment_date, $3),
                amount = COALESCE($4, amount),
                payment_method = COALESCE($5, payment_method),
                cancelled = FALSE,
                updated_at = NOW()
            WHERE unidade_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(id)
        .bind(payment_date)
        .bind(amount)
        .bind(payment_method)
        .fetch_optional(executor)
        .await?;
        Ok(payment)
    }

    pub async fn cancel<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ExternalPayment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, ExternalPayment>(
            r#"
            UPDATE external_payments
            SET cancelled = TRUE, updated_at = NOW()
            WHERE unidade_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(unidade_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(payment)
    }

    // =========================================================================
    //  WEBHOOK (pagamentos_asaas)
    // =========================================================================

    /// Grava o evento uma única vez. Retorna `None` se o `event_id` já existia.
    pub async fn record_gateway_event(
        &self,
        account: GatewayAccount,
        event: &AsaasWebhookEvent,
        payload: &Value,
    ) -> Result<Option<GatewayPaymentRecord>, AppError> {
        let payment = event.payment.as_ref();

        let record = sqlx::query_as::<_, GatewayPaymentRecord>(
            r#"
            INSERT INTO pagamentos_asaas (
                account, event_id, event, payment_id, customer_id, subscription_id,
                amount, status, due_date, payment_date, payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (event_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(account.as_str())
        .bind(&event.id)
        .bind(&event.event)
        .bind(payment.map(|p| p.id.as_str()))
        .bind(payment.and_then(|p| p.customer.as_deref()))
        .bind(payment.and_then(|p| p.subscription.as_deref()))
        .bind(payment.and_then(|p| p.value))
        .bind(payment.and_then(|p| p.status.as_deref()))
        .bind(payment.and_then(|p| p.due_date))
        .bind(payment.and_then(|p| p.payment_date))
        .bind(payload)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
