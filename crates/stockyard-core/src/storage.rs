use async_trait::async_trait;
use uuid::Uuid;

use crate::error::MovementError;
use crate::models::{ContainerKind, EquipmentMovement, NewMovement};
use crate::movement::BalanceKey;

/// Opens movement transactions. The movement service is the only caller;
/// no other component may span more than one balance row in a transaction.
#[async_trait]
pub trait MovementStore: Send + Sync {
    type Tx: MovementTx;

    async fn begin(&self) -> Result<Self::Tx, MovementError>;
}

/// One transaction over the balance store and the ledger. Dropping the
/// transaction without committing discards every staged effect.
#[async_trait]
pub trait MovementTx: Send {
    /// Equipment type exists and is not soft-deleted.
    async fn equipment_type_live(&mut self, id: Uuid) -> Result<bool, MovementError>;

    /// Container of the given kind exists and is not soft-deleted.
    async fn container_live(
        &mut self,
        kind: ContainerKind,
        id: Uuid,
    ) -> Result<bool, MovementError>;

    /// Lock the balance row for `key` (creating it at zero under the lock
    /// if absent), add `delta`, and return the new quantity. A result below
    /// zero fails with `InsufficientQuantity` and poisons the transaction.
    async fn apply_delta(&mut self, key: &BalanceKey, delta: i64) -> Result<i64, MovementError>;

    /// Append one immutable ledger row.
    async fn append_movement(
        &mut self,
        movement: &NewMovement,
    ) -> Result<EquipmentMovement, MovementError>;

    async fn commit(self) -> Result<(), MovementError>;
}

/// Cross-entity audit trail, in addition to the ledger row itself.
/// Failures are the caller's to log; they never abort a committed movement.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn movement_recorded(&self, movement: &EquipmentMovement) -> anyhow::Result<()>;
}

pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn movement_recorded(&self, _movement: &EquipmentMovement) -> anyhow::Result<()> {
        Ok(())
    }
}
