pub mod service;
pub mod validate;

pub use service::MovementService;
pub use validate::{MovementRequest, ValidatedMovement, validate};
