use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::movement::{BalanceKey, MovementEndpoints, MovementType};

/// The three kinds of stock-holding container. The derived ordering
/// (warehouse < cabinet < assembly) is part of the fixed lock order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Warehouse,
    Cabinet,
    Assembly,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Warehouse => "warehouse",
            ContainerKind::Cabinet => "cabinet",
            ContainerKind::Assembly => "assembly",
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry. Movement logic only cares about existence and soft
/// deletion; the flag and unit price ride along for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentType {
    pub id: Uuid,
    pub name: String,
    pub is_channel_forming: bool,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: Uuid,
    pub kind: ContainerKind,
    pub name: String,
}

/// One keyed-quantity row; `quantity >= 0` always.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBalance {
    pub key: BalanceKey,
    pub quantity: i64,
    pub last_updated: DateTime<Utc>,
}

/// Immutable ledger row, one per accepted movement. Never updated or
/// deleted after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentMovement {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub equipment_type_id: Uuid,
    pub quantity: i64,
    pub from_warehouse_id: Option<Uuid>,
    pub to_warehouse_id: Option<Uuid>,
    pub from_cabinet_id: Option<Uuid>,
    pub to_cabinet_id: Option<Uuid>,
    pub to_assembly_id: Option<Uuid>,
    pub reference: Option<String>,
    pub comment: Option<String>,
    pub performed_by_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Ledger row about to be inserted; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub equipment_type_id: Uuid,
    pub quantity: i64,
    pub endpoints: MovementEndpoints,
    pub reference: Option<String>,
    pub comment: Option<String>,
    pub performed_by_id: Uuid,
}
