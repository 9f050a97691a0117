pub mod audit_bus;
pub mod config;
pub mod contracts;
pub mod db;

pub use audit_bus::{AuditBus, MOVEMENTS_CHANNEL};
pub use config::ServiceConfig;
pub use contracts::MovementRecordedEvent;
pub use db::connect_database;
