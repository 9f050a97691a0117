use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Published on [`crate::MOVEMENTS_CHANNEL`] after every committed
/// movement, in addition to the ledger row itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementRecordedEvent {
    pub movement_id: Uuid,
    pub movement_type: String,
    pub equipment_type_id: Uuid,
    pub quantity: i64,
    pub performed_by_id: Uuid,
}
