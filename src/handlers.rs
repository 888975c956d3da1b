pub mod appointments;
pub mod auth;
pub mod dashboard;
pub mod finance;
pub mod jobs;
pub mod queue;
pub mod registry;
pub mod subscriptions;
pub mod units;
pub mod webhooks;
