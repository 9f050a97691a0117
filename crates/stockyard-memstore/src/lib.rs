//! In-memory implementation of the movement storage traits. A write
//! transaction holds the store-wide write lock for its whole lifetime, so
//! concurrent movements are strictly serialized; staged changes become
//! visible only on commit and vanish when the transaction is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use stockyard_core::{
    BalanceKey, Container, ContainerKind, EquipmentMovement, EquipmentType, MovementError,
    MovementStore, MovementTx, NewMovement, StockBalance,
};

struct EquipmentTypeRow {
    info: EquipmentType,
    is_deleted: bool,
}

struct ContainerRow {
    info: Container,
    is_deleted: bool,
}

#[derive(Default)]
struct StoreState {
    equipment_types: HashMap<Uuid, EquipmentTypeRow>,
    containers: HashMap<(ContainerKind, Uuid), ContainerRow>,
    balances: HashMap<BalanceKey, StockBalance>,
    ledger: Vec<EquipmentMovement>,
}

#[derive(Clone, Default)]
pub struct MemMovementStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemMovementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_equipment_type(&self) -> Uuid {
        let id = Uuid::new_v4();
        let row = EquipmentTypeRow {
            info: EquipmentType {
                id,
                name: format!("equipment-{id}"),
                is_channel_forming: false,
                unit_price: None,
            },
            is_deleted: false,
        };
        self.state.write().await.equipment_types.insert(id, row);
        id
    }

    pub async fn add_container(&self, kind: ContainerKind) -> Uuid {
        let id = Uuid::new_v4();
        let row = ContainerRow {
            info: Container {
                id,
                kind,
                name: format!("{kind}-{id}"),
            },
            is_deleted: false,
        };
        self.state.write().await.containers.insert((kind, id), row);
        id
    }

    pub async fn soft_delete_equipment_type(&self, id: Uuid) {
        if let Some(row) = self.state.write().await.equipment_types.get_mut(&id) {
            row.is_deleted = true;
        }
    }

    pub async fn soft_delete_container(&self, kind: ContainerKind, id: Uuid) {
        if let Some(row) = self.state.write().await.containers.get_mut(&(kind, id)) {
            row.is_deleted = true;
        }
    }

    pub async fn set_balance(&self, key: BalanceKey, quantity: i64) {
        self.state.write().await.balances.insert(
            key,
            StockBalance {
                key,
                quantity,
                last_updated: Utc::now(),
            },
        );
    }

    pub async fn balance(&self, key: &BalanceKey) -> i64 {
        self.state
            .read()
            .await
            .balances
            .get(key)
            .map(|row| row.quantity)
            .unwrap_or(0)
    }

    pub async fn balances_snapshot(&self) -> HashMap<BalanceKey, i64> {
        self.state
            .read()
            .await
            .balances
            .iter()
            .map(|(key, row)| (*key, row.quantity))
            .collect()
    }

    pub async fn movements(&self) -> Vec<EquipmentMovement> {
        self.state.read().await.ledger.clone()
    }

    pub async fn equipment_type(&self, id: Uuid) -> Option<EquipmentType> {
        self.state
            .read()
            .await
            .equipment_types
            .get(&id)
            .map(|row| row.info.clone())
    }

    pub async fn container(&self, kind: ContainerKind, id: Uuid) -> Option<Container> {
        self.state
            .read()
            .await
            .containers
            .get(&(kind, id))
            .map(|row| row.info.clone())
    }
}

pub struct MemMovementTx {
    guard: OwnedRwLockWriteGuard<StoreState>,
    staged_balances: HashMap<BalanceKey, i64>,
    staged_ledger: Vec<EquipmentMovement>,
}

#[async_trait]
impl MovementStore for MemMovementStore {
    type Tx = MemMovementTx;

    async fn begin(&self) -> Result<Self::Tx, MovementError> {
        let guard = self.state.clone().write_owned().await;
        Ok(MemMovementTx {
            guard,
            staged_balances: HashMap::new(),
            staged_ledger: Vec::new(),
        })
    }
}

#[async_trait]
impl MovementTx for MemMovementTx {
    async fn equipment_type_live(&mut self, id: Uuid) -> Result<bool, MovementError> {
        Ok(self
            .guard
            .equipment_types
            .get(&id)
            .is_some_and(|row| !row.is_deleted))
    }

    async fn container_live(
        &mut self,
        kind: ContainerKind,
        id: Uuid,
    ) -> Result<bool, MovementError> {
        Ok(self
            .guard
            .containers
            .get(&(kind, id))
            .is_some_and(|row| !row.is_deleted))
    }

    async fn apply_delta(&mut self, key: &BalanceKey, delta: i64) -> Result<i64, MovementError> {
        let current = self
            .staged_balances
            .get(key)
            .copied()
            .or_else(|| self.guard.balances.get(key).map(|row| row.quantity))
            .unwrap_or(0);
        let new_quantity = current.checked_add(delta).ok_or_else(|| {
            MovementError::Storage(anyhow!("stock balance overflow at {key:?}"))
        })?;
        if new_quantity < 0 {
            return Err(MovementError::InsufficientQuantity {
                key: *key,
                available: current,
                requested: -delta,
            });
        }
        self.staged_balances.insert(*key, new_quantity);
        Ok(new_quantity)
    }

    async fn append_movement(
        &mut self,
        movement: &NewMovement,
    ) -> Result<EquipmentMovement, MovementError> {
        let record = EquipmentMovement {
            id: Uuid::new_v4(),
            movement_type: movement.movement_type,
            equipment_type_id: movement.equipment_type_id,
            quantity: movement.quantity,
            from_warehouse_id: movement.endpoints.from_warehouse_id,
            to_warehouse_id: movement.endpoints.to_warehouse_id,
            from_cabinet_id: movement.endpoints.from_cabinet_id,
            to_cabinet_id: movement.endpoints.to_cabinet_id,
            to_assembly_id: movement.endpoints.to_assembly_id,
            reference: movement.reference.clone(),
            comment: movement.comment.clone(),
            performed_by_id: movement.performed_by_id,
            created_at: Utc::now(),
        };
        self.staged_ledger.push(record.clone());
        Ok(record)
    }

    async fn commit(mut self) -> Result<(), MovementError> {
        let now = Utc::now();
        for (key, quantity) in self.staged_balances.drain() {
            self.guard.balances.insert(
                key,
                StockBalance {
                    key,
                    quantity,
                    last_updated: now,
                },
            );
        }
        self.guard.ledger.append(&mut self.staged_ledger);
        Ok(())
    }
}
