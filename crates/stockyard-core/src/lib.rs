pub mod error;
pub mod models;
pub mod movement;
pub mod storage;

pub use error::MovementError;
pub use models::{
    Container, ContainerKind, EquipmentMovement, EquipmentType, NewMovement, StockBalance,
};
pub use movement::{
    AdjustmentSide, BalanceDelta, BalanceKey, MovementEndpoints, MovementKind, MovementType,
    StockSource,
};
pub use storage::{AuditSink, MovementStore, MovementTx, NoopAuditSink};
