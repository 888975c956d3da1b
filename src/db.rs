pub mod user_repo;
pub use user_repo::UserRepository;
pub mod unit_repo;
pub use unit_repo::UnitRepository;
pub mod registry_repo;
pub use registry_repo::{ClientRepository, ProfessionalRepository};
pub mod queue_repo;
pub use queue_repo::QueueRepository;
pub mod appointment_repo;
pub use appointment_repo::AppointmentRepository;
pub mod subscription_repo;
pub use subscription_repo::ExternalPaymentRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod job_repo;
pub use job_repo::JobRepository;
