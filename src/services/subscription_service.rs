// src/services/subscription_service.rs

use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped_transaction, error::AppError},
    config::StatusRules,
    db::ExternalPaymentRepository,
    models::subscriptions::{
        AsaasWebhookEvent, ComparisonMode, ExternalPayment, ExternalPaymentPayload, GatewayAccount,
        GatewayCustomer, PaymentLink, RegisterPaymentPayload, StatusRule, SubscriberListResponse,
        SubscriberRow, SubscriberStatus, SubscriptionSource, WebhookAck,
    },
    services::gateway::{GatewayError, PaymentGateway},
};

// =============================================================================
//  CLASSIFICADOR
// =============================================================================

pub fn days_since(reference: NaiveDate, today: NaiveDate) -> i64 {
    (today - reference).num_days()
}

/// Status de um assinante a partir da data de referência (próximo
/// vencimento no gateway, último pagamento nos externos).
/// Data no futuro conta como dias negativos, logo ativo.
pub fn classify_status(reference: NaiveDate, today: NaiveDate, rule: StatusRule, cancelled: bool) -> SubscriberStatus {
    if cancelled {
        return SubscriberStatus::Cancelado;
    }

    let days = days_since(reference, today);
    let within = match rule.mode {
        ComparisonMode::AtMost => days <= rule.threshold_days,
        ComparisonMode::LessThan => days < rule.threshold_days,
    };

    if within { SubscriberStatus::Ativo } else { SubscriberStatus::Atrasado }
}

/// Linhas de uma conta do gateway. Cliente sem assinatura fica de fora:
/// não há data de referência para classificar.
pub fn gateway_rows(
    source: SubscriptionSource,
    customers: Vec<GatewayCustomer>,
    today: NaiveDate,
    rule: StatusRule,
) -> Vec<SubscriberRow> {
    customers
        .into_iter()
        .filter_map(|customer| {
            let sub = customer.subscriptions.first()?.clone();
            Some(SubscriberRow {
                source,
                id: customer.id,
                subscription_id: Some(sub.id.clone()),
                name: customer.name,
                email: customer.email,
                phone: customer.mobile_phone,
                value: sub.value,
                reference_date: sub.next_due_date,
                days_since_reference: days_since(sub.next_due_date, today),
                status: classify_status(sub.next_due_date, today, rule, sub.is_cancelled()),
            })
        })
        .collect()
}

pub fn external_rows(payments: Vec<ExternalPayment>, today: NaiveDate, rule: StatusRule) -> Vec<SubscriberRow> {
    payments
        .into_iter()
        .map(|p| SubscriberRow {
            source: SubscriptionSource::External,
            id: p.id.to_string(),
            subscription_id: None,
            name: p.client_name,
            email: p.client_email,
            phone: p.client_phone,
            value: p.amount,
            reference_date: p.last_payment_date,
            days_since_reference: days_since(p.last_payment_date, today),
            status: classify_status(p.last_payment_date, today, rule, p.cancelled),
        })
        .collect()
}

// =============================================================================
//  SERVIÇO
// =============================================================================

/// Clientes do gateway por conta. Conta sem chave configurada não entra.
#[derive(Clone, Default)]
pub struct GatewayClients {
    clients: HashMap<GatewayAccount, Arc<dyn PaymentGateway>>,
}

impl GatewayClients {
    pub fn insert(&mut self, account: GatewayAccount, client: Arc<dyn PaymentGateway>) {
        self.clients.insert(account, client);
    }

    pub fn get(&self, account: GatewayAccount) -> Result<&Arc<dyn PaymentGateway>, AppError> {
        self.clients
            .get(&account)
            .ok_or_else(|| AppError::GatewayNotConfigured(account.as_str().to_string()))
    }
}

#[derive(Clone)]
pub struct SubscriptionService {
    gateways: GatewayClients,
    external_repo: ExternalPaymentRepository,
    rules: StatusRules,
    webhook_token: Option<String>,
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(
        gateways: GatewayClients,
        external_repo: ExternalPaymentRepository,
        rules: StatusRules,
        webhook_token: Option<String>,
        pool: PgPool,
    ) -> Self {
        Self { gateways, external_repo, rules, webhook_token, pool }
    }

    pub fn parse_account(raw: &str) -> Result<GatewayAccount, AppError> {
        raw.parse::<GatewayAccount>().map_err(AppError::UnknownGatewayAccount)
    }

    // Falha da fonte vira lista vazia + aviso no log.
    async fn fetch_gateway_source(&self, account: GatewayAccount, today: NaiveDate) -> Option<Vec<SubscriberRow>> {
        let result = match self.gateways.get(account) {
            Ok(client) => client.list_customers_with_subscriptions().await.map_err(AppError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(customers) => Some(gateway_rows(account.source(), customers, today, self.rules.gateway)),
            Err(e) => {
                tracing::warn!("⚠️ Fonte {:?} indisponível, seguindo sem ela: {}", account.source(), e);
                None
            }
        }
    }

    async fn fetch_external_source(&self, unidade_id: Uuid, user_id: Uuid, today: NaiveDate) -> Option<Vec<SubscriberRow>> {
        let result = async {
            let mut tx = begin_scoped_transaction(&self.pool, unidade_id, user_id).await?;
            let payments = self.external_repo.list(&mut *tx, unidade_id).await?;
            tx.commit().await?;
            Ok::<_, AppError>(payments)
        }
        .await;

        match result {
            Ok(payments) => Some(external_rows(payments, today, self.rules.external)),
            Err(e) => {
                tracing::warn!("⚠️ Fonte EXTERNAL indisponível, seguindo sem ela: {}", e);
                None
            }
        }
    }

    /// Lista unificada das três fontes, buscadas em paralelo.
    /// Nunca falha: fonte com erro sai vazia e aparece em `unavailable_sources`.
    pub async fn list_subscribers(&self, unidade_id: Uuid, user_id: Uuid, today: NaiveDate) -> SubscriberListResponse {
        let (trato, andrey, external) = tokio::join!(
            self.fetch_gateway_source(GatewayAccount::Trato, today),
            self.fetch_gateway_source(GatewayAccount::Andrey, today),
            self.fetch_external_source(unidade_id, user_id, today),
        );

        merge_sources([
            (SubscriptionSource::AsaasTrato, trato),
            (SubscriptionSource::AsaasAndrey, andrey),
            (SubscriptionSource::External, external),
        ])
    }

    /// Clientes da conta cuja primeira assinatura está em dia pela regra do gateway.
    pub async fn active_gateway_customers(
        &self,
        account: GatewayAccount,
        today: NaiveDate,
    ) -> Result<Vec<GatewayCustomer>, AppError> {
        let customers = self.gateways.get(account)?.list_customers_with_subscriptions().await?;
        Ok(filter_active(customers, today, self.rules.gateway))
    }

    pub async fn cancel_gateway_subscription(&self, account: GatewayAccount, subscription_id: &str) -> Result<(), AppError> {
        self.gateways.get(account)?.cancel_subscription(subscription_id).await?;
        tracing::info!("🛑 Assinatura {} cancelada na conta {}", subscription_id, account.as_str());
        Ok(())
    }

    /// Link inexistente é resultado vazio, não erro.
    pub async fn payment_link(&self, account: GatewayAccount, link_id: &str) -> Result<Option<PaymentLink>, AppError> {
        match self.gateways.get(account)?.get_payment_link(link_id).await {
            Ok(link) => Ok(Some(link)),
            Err(GatewayError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    //  PAGAMENTOS EXTERNOS
    // =========================================================================

    pub async fn create_external<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        payload: &ExternalPaymentPayload,
    ) -> Result<ExternalPayment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.external_repo
            .create(
                executor,
                unidade_id,
                payload.client_name.trim(),
                payload.client_email.as_deref(),
                payload.client_phone.as_deref(),
                payload.amount,
                payload.payment_method.as_deref(),
                payload.last_payment_date,
                payload.notes.as_deref(),
            )
            .await
    }

    pub async fn list_external<'e, E>(&self, executor: E, unidade_id: Uuid) -> Result<Vec<ExternalPayment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.external_repo.list(executor, unidade_id).await
    }

    pub async fn register_external_payment<'e, E>(
        &self,
        executor: E,
        unidade_id: Uuid,
        id: Uuid,
        payload: &RegisterPaymentPayload,
        today: NaiveDate,
    ) -> Result<ExternalPayment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.external_repo
            .register_payment(
                executor,
                unidade_id,
                id,
                payload.payment_date.unwrap_or(today),
                payload.amount,
                payload.payment_method.as_deref(),
            )
            .await?
            .ok_or(AppError::NotFound("external_payment"))
    }

    pub async fn cancel_external<'e, E>(&self, executor: E, unidade_id: Uuid, id: Uuid) -> Result<ExternalPayment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.external_repo
            .cancel(executor, unidade_id, id)
            .await?
            .ok_or(AppError::NotFound("external_payment"))
    }

    // =========================================================================
    //  WEBHOOK
    // =========================================================================

    pub fn verify_webhook_token(&self, received: Option<&str>) -> Result<(), AppError> {
        let expected = self
            .webhook_token
            .as_deref()
            .ok_or_else(|| AppError::GatewayNotConfigured("webhook".to_string()))?;

        // Comparação em tempo constante
        match received {
            Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
            _ => Err(AppError::InvalidToken),
        }
    }

    /// Grava o evento em `pagamentos_asaas`. Reentrega do mesmo evento é ignorada.
    pub async fn ingest_webhook(&self, account: GatewayAccount, payload: Value) -> Result<WebhookAck, AppError> {
        let event: AsaasWebhookEvent =
            serde_json::from_value(payload.clone()).map_err(|e| AppError::InvalidPayload(e.to_string()))?;

        let stored = self.external_repo.record_gateway_event(account, &event, &payload).await?.is_some();

        if stored {
            tracing::info!("💰 Evento {} ({}) gravado para a conta {}", event.id, event.event, account.as_str());
        } else {
            tracing::info!("↩️ Evento {} já processado, ignorando", event.id);
        }

        Ok(WebhookAck { received: true, stored })
    }
}

pub fn filter_active(customers: Vec<GatewayCustomer>, today: NaiveDate, rule: StatusRule) -> Vec<GatewayCustomer> {
    customers
        .into_iter()
        .filter(|c| {
            c.subscriptions
                .first()
                .map(|s| classify_status(s.next_due_date, today, rule, s.is_cancelled()) == SubscriberStatus::Ativo)
                .unwrap_or(false)
        })
        .collect()
}

/// Concatena as fontes na ordem recebida; fonte ausente entra vazia.
pub fn merge_sources<const N: usize>(
    sources: [(SubscriptionSource, Option<Vec<SubscriberRow>>); N],
) -> SubscriberListResponse {
    let mut subscribers = Vec::new();
    let mut unavailable_sources = Vec::new();

    for (source, rows) in sources {
        match rows {
            Some(rows) => subscribers.extend(rows),
            None => unavailable_sources.push(source),
        }
    }

    SubscriberListResponse { subscribers, unavailable_sources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use sqlx::postgres::PgPoolOptions;

    use crate::models::subscriptions::GatewaySubscription;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn days_ago(n: i64) -> NaiveDate {
        today() - Duration::days(n)
    }

    fn customer(id: &str, due: NaiveDate, status: &str) -> GatewayCustomer {
        GatewayCustomer {
            id: id.to_string(),
            name: format!("Cliente {id}"),
            email: None,
            mobile_phone: None,
            cpf_cnpj: None,
            subscriptions: vec![GatewaySubscription {
                id: format!("sub_{id}"),
                customer: id.to_string(),
                value: Decimal::new(8990, 2),
                next_due_date: due,
                cycle: Some("MONTHLY".into()),
                status: status.to_string(),
                description: None,
                deleted: false,
            }],
        }
    }

    fn external(name: &str, last_payment: NaiveDate) -> ExternalPayment {
        ExternalPayment {
            id: Uuid::new_v4(),
            unidade_id: Uuid::new_v4(),
            client_name: name.to_string(),
            client_email: None,
            client_phone: None,
            amount: Decimal::new(7990, 2),
            payment_method: Some("PIX".into()),
            last_payment_date: last_payment,
            cancelled: false,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct FakeGateway {
        customers: Vec<GatewayCustomer>,
        fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn list_customers_with_subscriptions(&self) -> Result<Vec<GatewayCustomer>, GatewayError> {
            if self.fail {
                return Err(GatewayError::Status { status: 503, body: "fora do ar".into() });
            }
            Ok(self.customers.clone())
        }

        async fn cancel_subscription(&self, _subscription_id: &str) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn get_payment_link(&self, _link_id: &str) -> Result<PaymentLink, GatewayError> {
            Err(GatewayError::NotFound)
        }
    }

    fn service(trato: FakeGateway) -> SubscriptionService {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/barbearia_test").unwrap();
        let mut gateways = GatewayClients::default();
        gateways.insert(GatewayAccount::Trato, Arc::new(trato));
        SubscriptionService::new(
            gateways,
            ExternalPaymentRepository::new(pool.clone()),
            StatusRules::default(),
            Some("segredo".into()),
            pool,
        )
    }

    #[test]
    fn external_payment_thirty_days_old_is_still_active() {
        let rule = StatusRules::default().external;
        assert_eq!(classify_status(days_ago(30), today(), rule, false), SubscriberStatus::Ativo);
        assert_eq!(classify_status(days_ago(31), today(), rule, false), SubscriberStatus::Atrasado);
    }

    #[test]
    fn future_reference_dates_are_active() {
        let rule = StatusRules::default().gateway;
        assert_eq!(classify_status(today() + Duration::days(10), today(), rule, false), SubscriberStatus::Ativo);
    }

    #[test]
    fn cancelled_wins_over_dates() {
        let rule = StatusRules::default().external;
        assert_eq!(classify_status(today(), today(), rule, true), SubscriberStatus::Cancelado);
    }

    #[test]
    fn less_than_mode_moves_the_boundary() {
        let rule = StatusRule::new(30, ComparisonMode::LessThan);
        assert_eq!(classify_status(days_ago(29), today(), rule, false), SubscriberStatus::Ativo);
        assert_eq!(classify_status(days_ago(30), today(), rule, false), SubscriberStatus::Atrasado);
    }

    #[test]
    fn active_filter_keeps_one_day_overdue_and_drops_two() {
        let customers = vec![
            customer("um_dia", days_ago(1), "ACTIVE"),
            customer("dois_dias", days_ago(2), "ACTIVE"),
            customer("cancelado", today(), "INACTIVE"),
        ];
        let active = filter_active(customers, today(), StatusRules::default().gateway);
        let ids: Vec<_> = active.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["um_dia"]);
    }

    #[test]
    fn merged_list_tags_each_row_with_its_source_and_status() {
        let rules = StatusRules::default();
        let trato = gateway_rows(
            SubscriptionSource::AsaasTrato,
            vec![customer("t1", days_ago(0), "ACTIVE"), customer("t2", days_ago(5), "ACTIVE")],
            today(),
            rules.gateway,
        );
        let andrey = gateway_rows(
            SubscriptionSource::AsaasAndrey,
            vec![customer("a1", days_ago(1), "ACTIVE")],
            today(),
            rules.gateway,
        );
        let externals = external_rows(
            vec![external("Marcos", days_ago(10)), external("Paulo", days_ago(45))],
            today(),
            rules.external,
        );

        let merged = merge_sources([
            (SubscriptionSource::AsaasTrato, Some(trato)),
            (SubscriptionSource::AsaasAndrey, Some(andrey)),
            (SubscriptionSource::External, Some(externals)),
        ]);

        let summary: Vec<_> = merged.subscribers.iter().map(|r| (r.source, r.status)).collect();
        assert_eq!(
            summary,
            vec![
                (SubscriptionSource::AsaasTrato, SubscriberStatus::Ativo),
                (SubscriptionSource::AsaasTrato, SubscriberStatus::Atrasado),
                (SubscriptionSource::AsaasAndrey, SubscriberStatus::Ativo),
                (SubscriptionSource::External, SubscriberStatus::Ativo),
                (SubscriptionSource::External, SubscriberStatus::Atrasado),
            ]
        );
        assert!(merged.unavailable_sources.is_empty());
        assert_eq!(merged.subscribers[1].days_since_reference, 5);
    }

    #[test]
    fn missing_source_is_reported_not_fatal() {
        let merged = merge_sources([
            (SubscriptionSource::AsaasTrato, None),
            (SubscriptionSource::External, Some(external_rows(vec![external("Ana", today())], today(), StatusRules::default().external))),
        ]);
        assert_eq!(merged.subscribers.len(), 1);
        assert_eq!(merged.unavailable_sources, vec![SubscriptionSource::AsaasTrato]);
    }

    #[tokio::test]
    async fn failing_gateway_is_swallowed() {
        let svc = service(FakeGateway { customers: vec![], fail: true });
        assert!(svc.fetch_gateway_source(GatewayAccount::Trato, today()).await.is_none());
        // conta sem chave também conta como indisponível
        assert!(svc.fetch_gateway_source(GatewayAccount::Andrey, today()).await.is_none());
    }

    #[tokio::test]
    async fn unknown_link_is_an_empty_result() {
        let svc = service(FakeGateway { customers: vec![], fail: false });
        assert!(svc.payment_link(GatewayAccount::Trato, "123").await.unwrap().is_none());
        assert!(matches!(
            svc.payment_link(GatewayAccount::Andrey, "123").await,
            Err(AppError::GatewayNotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn webhook_token_must_match() {
        let svc = service(FakeGateway { customers: vec![], fail: false });
        assert!(svc.verify_webhook_token(Some("segredo")).is_ok());
        assert!(matches!(svc.verify_webhook_token(Some("outro")), Err(AppError::InvalidToken)));
        assert!(matches!(svc.verify_webhook_token(None), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn webhook_token_prefixes_and_extensions_are_rejected() {
        let svc = service(FakeGateway { customers: vec![], fail: false });
        for token in ["", "segred", "segredo ", "segredo2", "SEGREDO"] {
            assert!(matches!(svc.verify_webhook_token(Some(token)), Err(AppError::InvalidToken)), "{token:?}");
        }
    }

    #[test]
    fn account_names_are_case_insensitive() {
        assert_eq!(SubscriptionService::parse_account("TRATO").unwrap(), GatewayAccount::Trato);
        assert!(matches!(SubscriptionService::parse_account("outra"), Err(AppError::UnknownGatewayAccount(_))));
    }
}
