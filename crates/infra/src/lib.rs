//! Infrastructure layer: in-memory adapters, background jobs, mail queueing,
//! the order status workflow, and configuration.

pub mod config;
pub mod jobs;
pub mod mail;
pub mod memory;
pub mod tasks;
pub mod workflow;

pub use config::AppConfig;
pub use mail::JobMailSender;
pub use memory::{InMemoryNotificationStore, InMemoryOrderRepository, InMemoryUserDirectory};
pub use tasks::{notification_job, register_notification_sender};
pub use workflow::{OrderWorkflow, WorkflowError};
