// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::{FixedOffset, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        AppointmentRepository, ClientRepository, DashboardRepository, ExternalPaymentRepository,
        FinanceRepository, JobRepository, ProfessionalRepository, QueueRepository, UnitRepository,
        UserRepository,
    },
    models::subscriptions::{ComparisonMode, GatewayAccount, StatusRule},
    services::{
        appointment_service::AppointmentService,
        auth::AuthService,
        dashboard_service::DashboardService,
        finance_service::FinanceService,
        gateway::{AsaasClient, PaymentGateway},
        job_service::JobService,
        queue_service::QueueService,
        registry_service::RegistryService,
        subscription_service::{GatewayClients, SubscriptionService},
        unit_service::UnitService,
    },
};

/// Regras de status por fonte. Os limites padrão (1 dia para o gateway,
/// 30 dias para pagamentos externos) são diferentes de propósito e
/// configuráveis de forma independente.
#[derive(Debug, Clone, Copy)]
pub struct StatusRules {
    pub gateway: StatusRule,
    pub external: StatusRule,
}

impl Default for StatusRules {
    fn default() -> Self {
        Self {
            gateway: StatusRule::new(1, ComparisonMode::AtMost),
            external: StatusRule::new(30, ComparisonMode::AtMost),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsaasAccountConfig {
    pub account: GatewayAccount,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub utc_offset: FixedOffset,
    pub asaas_base_url: String,
    pub asaas_accounts: Vec<AsaasAccountConfig>,
    pub asaas_webhook_token: Option<String>,
    pub http_timeout: Duration,
    pub status_rules: StatusRules,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let offset_hours: i32 = parse_env_or("APP_UTC_OFFSET_HOURS", -3)?;
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .with_context(|| format!("APP_UTC_OFFSET_HOURS fora do intervalo: {}", offset_hours))?;

        let mut asaas_accounts = Vec::new();
        for account in GatewayAccount::ALL {
            let key = format!("ASAAS_{}_API_KEY", account.env_suffix());
            match env::var(&key) {
                Ok(api_key) if !api_key.trim().is_empty() => {
                    asaas_accounts.push(AsaasAccountConfig { account, api_key })
                }
                _ => tracing::warn!("⚠️ {} ausente: a conta {:?} ficará sem dados do gateway.", key, account),
            }
        }

        let mut status_rules = StatusRules::default();
        status_rules.gateway.threshold_days = parse_env_or("GATEWAY_GRACE_DAYS", status_rules.gateway.threshold_days)?;
        status_rules.external.threshold_days = parse_env_or("EXTERNAL_GRACE_DAYS", status_rules.external.threshold_days)?;
        status_rules.gateway.mode = parse_env_or("GATEWAY_COMPARISON_MODE", status_rules.gateway.mode)?;
        status_rules.external.mode = parse_env_or("EXTERNAL_COMPARISON_MODE", status_rules.external.mode)?;

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_env_or("DB_MAX_CONNECTIONS", 5)?,
            utc_offset,
            asaas_base_url: env::var("ASAAS_BASE_URL").unwrap_or_else(|_| "https://api.asaas.com/v3".to_string()),
            asaas_accounts,
            asaas_webhook_token: env::var("ASAAS_WEBHOOK_TOKEN").ok().filter(|t| !t.is_empty()),
            http_timeout: Duration::from_secs(parse_env_or("HTTP_TIMEOUT_SECS", 15)?),
            status_rules,
        })
    }
}

/// Lê uma variável opcional; presente mas inválida é erro de configuração.
pub fn parse_env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Valor inválido para {}: '{}' ({})", key, raw, e))
}

/// Relógio da aplicação: "hoje" no fuso da barbearia, não em UTC.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: FixedOffset,
}

impl Clock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub clock: Clock,
    pub i18n_store: I18nStore,

    pub auth_service: AuthService,
    pub unit_service: UnitService,
    pub registry_service: RegistryService,
    pub queue_service: QueueService,
    pub appointment_service: AppointmentService,
    pub subscription_service: SubscriptionService,
    pub finance_service: FinanceService,
    pub dashboard_service: DashboardService,
    pub job_service: JobService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::from_parts(config, db_pool)
    }

    /// Monta o gráfico de dependências sobre uma pool já criada.
    pub fn from_parts(config: Config, db_pool: PgPool) -> anyhow::Result<Self> {
        let clock = Clock::new(config.utc_offset);

        let mut gateways = GatewayClients::default();
        for account_cfg in &config.asaas_accounts {
            let client = AsaasClient::new(&config.asaas_base_url, &account_cfg.api_key, config.http_timeout)?;
            gateways.insert(account_cfg.account, Arc::new(client) as Arc<dyn PaymentGateway>);
        }

        // --- Repositórios ---
        let user_repo = UserRepository::new(db_pool.clone());
        let unit_repo = UnitRepository::new(db_pool.clone());
        let client_repo = ClientRepository::new();
        let professional_repo = ProfessionalRepository::new();
        let queue_repo = QueueRepository::new();
        let appointment_repo = AppointmentRepository::new();
        let external_repo = ExternalPaymentRepository::new(db_pool.clone());
        let finance_repo = FinanceRepository::new();
        let dashboard_repo = DashboardRepository::new();
        let job_repo = JobRepository::new();

        // --- Serviços ---
        let job_service = JobService::new(job_repo);
        let auth_service = AuthService::new(
            user_repo,
            job_service.clone(),
            config.jwt_secret.clone(),
            db_pool.clone(),
        );
        let unit_service = UnitService::new(unit_repo, db_pool.clone());
        let registry_service = RegistryService::new(client_repo, professional_repo);
        let queue_service = QueueService::new(queue_repo);
        let appointment_service = AppointmentService::new(appointment_repo);
        let subscription_service = SubscriptionService::new(
            gateways,
            external_repo,
            config.status_rules,
            config.asaas_webhook_token.clone(),
            db_pool.clone(),
        );
        let finance_service = FinanceService::new(finance_repo.clone());
        let dashboard_service = DashboardService::new(dashboard_repo, finance_repo, db_pool.clone());

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            clock,
            i18n_store: I18nStore::new(),
            auth_service,
            unit_service,
            registry_service,
            queue_service,
            appointment_service,
            subscription_service,
            finance_service,
            dashboard_service,
            job_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_reports_the_offending_variable() {
        let err = parse_value::<i64>("GATEWAY_GRACE_DAYS", "um dia").unwrap_err();
        assert!(err.to_string().contains("GATEWAY_GRACE_DAYS"));
        assert_eq!(parse_value::<i64>("X", " 30 ").unwrap(), 30);
    }

    #[test]
    fn default_rules_keep_the_two_thresholds_apart() {
        let rules = StatusRules::default();
        assert_eq!(rules.gateway.threshold_days, 1);
        assert_eq!(rules.external.threshold_days, 30);
        assert_eq!(rules.gateway.mode, ComparisonMode::AtMost);
    }

    #[test]
    fn comparison_mode_accepts_short_aliases() {
        assert_eq!(parse_value::<ComparisonMode>("M", "lt").unwrap(), ComparisonMode::LessThan);
        assert_eq!(parse_value::<ComparisonMode>("M", "AT_MOST").unwrap(), ComparisonMode::AtMost);
        assert!(parse_value::<ComparisonMode>("M", "maior").is_err());
    }
}
