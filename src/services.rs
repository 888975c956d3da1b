pub mod appointment_service;
pub mod auth;
pub mod dashboard_service;
pub mod finance_service;
pub mod gateway;
pub mod job_service;
pub mod queue_service;
pub mod registry_service;
pub mod subscription_service;
pub mod unit_service;
