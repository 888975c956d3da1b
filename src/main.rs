//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::{auth::auth_guard, tenancy::tenant_guard};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let addr = app_state.config.bind_addr.clone();
    let app = build_router(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}

fn build_router(app_state: AppState) -> Router {
    // Rotas de autenticação (públicas, exceto logout)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/password-recovery", post(handlers::auth::password_recovery))
        .route("/password-reset", post(handlers::auth::password_reset))
        .route(
            "/logout",
            post(handlers::auth::logout)
                .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard)),
        );

    // Só exigem login
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/unidades", get(handlers::auth::get_my_units))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let unit_routes = Router::new()
        .route("/", post(handlers::units::create_unit).get(handlers::units::list_my_units))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // --- Rotas por unidade (x-unidade-id) ---

    let registry_routes = Router::new()
        .route(
            "/clientes",
            post(handlers::registry::create_client).get(handlers::registry::list_clients),
        )
        .route(
            "/clientes/{id}",
            get(handlers::registry::get_client)
                .put(handlers::registry::update_client)
                .delete(handlers::registry::delete_client),
        )
        .route(
            "/profissionais",
            post(handlers::registry::create_professional).get(handlers::registry::list_professionals),
        )
        .route(
            "/profissionais/{id}",
            get(handlers::registry::get_professional)
                .put(handlers::registry::update_professional)
                .delete(handlers::registry::delete_professional),
        );

    let queue_routes = Router::new()
        .route("/", get(handlers::queue::get_queue))
        .route("/atender", post(handlers::queue::attend_turn))
        .route("/passar", post(handlers::queue::pass_turn))
        .route("/entrar", post(handlers::queue::join_queue))
        .route("/reset-diario", post(handlers::queue::reset_daily))
        .route("/{professional_id}/ativo", patch(handlers::queue::set_active));

    let appointment_routes = Router::new()
        .route(
            "/",
            post(handlers::appointments::create_appointment).get(handlers::appointments::list_appointments),
        )
        .route("/conflitos", get(handlers::appointments::check_conflicts))
        .route("/{id}/status", patch(handlers::appointments::update_status))
        .route("/{id}/horario", put(handlers::appointments::reschedule));

    let subscription_routes = Router::new()
        .route("/", get(handlers::subscriptions::list_subscribers))
        .route("/gateway/{conta}/ativos", get(handlers::subscriptions::list_active_gateway_customers))
        .route(
            "/gateway/{conta}/{subscription_id}/cancelar",
            post(handlers::subscriptions::cancel_gateway_subscription),
        )
        .route("/gateway/{conta}/links/{link_id}", get(handlers::subscriptions::get_payment_link))
        .route(
            "/externos",
            post(handlers::subscriptions::create_external).get(handlers::subscriptions::list_external),
        )
        .route("/externos/{id}/pagamento", post(handlers::subscriptions::register_external_payment))
        .route("/externos/{id}/cancelar", post(handlers::subscriptions::cancel_external));

    let finance_routes = Router::new()
        .route(
            "/lancamentos",
            post(handlers::finance::create_entry).get(handlers::finance::list_entries),
        )
        .route("/lancamentos/{id}", axum::routing::delete(handlers::finance::delete_entry))
        .route("/totais", get(handlers::finance::month_totals))
        .route("/metas", put(handlers::finance::upsert_goal).get(handlers::finance::get_goal));

    let job_routes = Router::new()
        .route("/", post(handlers::jobs::enqueue_job).get(handlers::jobs::list_jobs))
        .route("/{id}", get(handlers::jobs::get_job));

    // A última camada é a mais externa: auth roda antes do tenant_guard
    let tenant_routes = Router::new()
        .merge(registry_routes)
        .nest("/fila", queue_routes)
        .nest("/agendamentos", appointment_routes)
        .nest("/assinaturas", subscription_routes)
        .nest("/financeiro", finance_routes)
        .route("/dashboard/resumo", get(handlers::dashboard::get_summary))
        .nest("/jobs", job_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Chamado pelo Asaas, autenticado pelo token do webhook
    let webhook_routes = Router::new().route("/asaas/{conta}", post(handlers::webhooks::asaas_webhook));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/unidades", unit_routes)
        .nest("/api/webhooks", webhook_routes)
        .nest("/api", tenant_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StatusRules};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::FixedOffset;
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    fn test_config(webhook_token: Option<&str>) -> Config {
        Config {
            database_url: "postgres://localhost:1/nada".to_string(),
            jwt_secret: "segredo-de-teste".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            db_max_connections: 1,
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
            asaas_base_url: "http://127.0.0.1:1".to_string(),
            asaas_accounts: vec![],
            asaas_webhook_token: webhook_token.map(str::to_string),
            http_timeout: Duration::from_secs(1),
            status_rules: StatusRules::default(),
        }
    }

    // Nenhum destes testes chega ao banco: a pool é preguiçosa e aponta para o nada
    fn server(webhook_token: Option<&str>) -> TestServer {
        let config = test_config(webhook_token);
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .unwrap();
        let app_state = AppState::from_parts(config, pool).unwrap();
        TestServer::new(build_router(app_state)).unwrap()
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let response = server(None).get("/api/health").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn unit_routes_require_a_bearer_token() {
        let server = server(None);

        server.get("/api/fila").await.assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/api/agendamentos/conflitos?data=2026-10-16")
            .add_header("x-unidade-id", "4a7a4a64-3f4b-4bd1-9d0a-5d1f3d0b1c2e")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server.get("/api/users/me").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_before_any_query() {
        server(None)
            .get("/api/assinaturas")
            .authorization_bearer("nao-e-um-jwt")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_without_configured_token_is_unavailable() {
        server(None)
            .post("/api/webhooks/asaas/trato")
            .json(&json!({ "id": "evt_1", "event": "PAYMENT_RECEIVED" }))
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn webhook_checks_the_shared_token() {
        let server = server(Some("token-certo"));

        server
            .post("/api/webhooks/asaas/trato")
            .json(&json!({ "id": "evt_1", "event": "PAYMENT_RECEIVED" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .post("/api/webhooks/asaas/trato")
            .add_header("asaas-access-token", "token-errado")
            .json(&json!({ "id": "evt_1", "event": "PAYMENT_RECEIVED" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_for_unknown_account_is_a_client_error() {
        server(Some("token-certo"))
            .post("/api/webhooks/asaas/outra")
            .add_header("asaas-access-token", "token-certo")
            .json(&json!({ "id": "evt_1", "event": "PAYMENT_RECEIVED" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[test]
    fn openapi_document_lists_the_core_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/api/fila/atender", "/api/agendamentos/conflitos", "/api/assinaturas"] {
            assert!(doc.paths.paths.contains_key(path), "faltando {}", path);
        }
    }
}
