// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::password_recovery,
        handlers::auth::password_reset,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_units,

        // --- Unidades ---
        handlers::units::create_unit,
        handlers::units::list_my_units,

        // --- Cadastros ---
        handlers::registry::create_client,
        handlers::registry::list_clients,
        handlers::registry::get_client,
        handlers::registry::update_client,
        handlers::registry::delete_client,
        handlers::registry::create_professional,
        handlers::registry::list_professionals,
        handlers::registry::get_professional,
        handlers::registry::update_professional,
        handlers::registry::delete_professional,

        // --- Fila ---
        handlers::queue::get_queue,
        handlers::queue::attend_turn,
        handlers::queue::pass_turn,
        handlers::queue::join_queue,
        handlers::queue::set_active,
        handlers::queue::reset_daily,

        // --- Agendamentos ---
        handlers::appointments::check_conflicts,
        handlers::appointments::create_appointment,
        handlers::appointments::list_appointments,
        handlers::appointments::update_status,
        handlers::appointments::reschedule,

        // --- Assinaturas ---
        handlers::subscriptions::list_subscribers,
        handlers::subscriptions::list_active_gateway_customers,
        handlers::subscriptions::cancel_gateway_subscription,
        handlers::subscriptions::get_payment_link,
        handlers::subscriptions::create_external,
        handlers::subscriptions::list_external,
        handlers::subscriptions::register_external_payment,
        handlers::subscriptions::cancel_external,
        handlers::webhooks::asaas_webhook,

        // --- Financeiro ---
        handlers::finance::create_entry,
        handlers::finance::list_entries,
        handlers::finance::delete_entry,
        handlers::finance::month_totals,
        handlers::finance::upsert_goal,
        handlers::finance::get_goal,

        // --- Dashboard ---
        handlers::dashboard::get_summary,

        // --- Jobs ---
        handlers::jobs::enqueue_job,
        handlers::jobs::list_jobs,
        handlers::jobs::get_job,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::PasswordRecoveryPayload,
            models::auth::PasswordResetPayload,
            models::auth::AuthResponse,

            // --- Unidades e cadastros ---
            models::units::Unit,
            handlers::units::CreateUnitPayload,
            models::registry::Client,
            models::registry::Professional,
            models::registry::ClientPayload,
            models::registry::ProfessionalPayload,

            // --- Fila ---
            models::queue::QueueEntry,
            models::queue::QueueEntryView,
            models::queue::QueueAdvanceResponse,
            handlers::queue::AdvancePayload,
            handlers::queue::JoinQueuePayload,
            handlers::queue::SetActivePayload,
            handlers::queue::ResetDailyResponse,

            // --- Agendamentos ---
            models::appointments::AppointmentStatus,
            models::appointments::Appointment,
            models::appointments::ConflictCheckResponse,
            models::appointments::CreateAppointmentPayload,
            models::appointments::ReschedulePayload,
            models::appointments::UpdateStatusPayload,

            // --- Assinaturas ---
            models::subscriptions::GatewayAccount,
            models::subscriptions::SubscriptionSource,
            models::subscriptions::SubscriberStatus,
            models::subscriptions::GatewaySubscription,
            models::subscriptions::GatewayCustomer,
            models::subscriptions::PaymentLink,
            models::subscriptions::ExternalPayment,
            models::subscriptions::ExternalPaymentPayload,
            models::subscriptions::RegisterPaymentPayload,
            models::subscriptions::SubscriberRow,
            models::subscriptions::SubscriberListResponse,
            models::subscriptions::WebhookAck,

            // --- Financeiro ---
            models::finance::LedgerKind,
            models::finance::LedgerEntry,
            models::finance::MonthlyGoal,
            models::finance::LedgerTotals,
            models::finance::CreateLedgerEntryPayload,
            models::finance::GoalPayload,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,

            // --- Jobs ---
            models::jobs::JobKind,
            models::jobs::JobStatus,
            models::jobs::Job,
            handlers::jobs::EnqueueJobPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, registro e recuperação de senha"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Unidades", description = "Barbearias (tenants) e vínculo de usuários"),
        (name = "Clientes", description = "Cadastro de clientes da unidade"),
        (name = "Profissionais", description = "Cadastro de barbeiros da unidade"),
        (name = "Fila", description = "Fila de atendimento dos barbeiros"),
        (name = "Agendamentos", description = "Agenda e checagem de conflito"),
        (name = "Assinaturas", description = "Assinantes Asaas (Trato e Andrey) e pagamentos externos"),
        (name = "Webhooks", description = "Eventos recebidos do Asaas"),
        (name = "Financeiro", description = "Lançamentos e metas mensais"),
        (name = "Dashboard", description = "Indicadores do mês"),
        (name = "Jobs", description = "Fila de tarefas em segundo plano")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
