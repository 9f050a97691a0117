use std::sync::Arc;

use uuid::Uuid;

use stockyard_core::{
    BalanceKey, ContainerKind, MovementEndpoints, MovementType, NoopAuditSink,
};
use stockyard_memstore::MemMovementStore;
use stockyard_movements::{MovementRequest, MovementService};

pub struct Fixture {
    pub store: MemMovementStore,
    pub service: MovementService<MemMovementStore>,
    pub equipment: Uuid,
    pub actor: Uuid,
}

pub async fn fixture() -> Fixture {
    let store = MemMovementStore::new();
    let equipment = store.add_equipment_type().await;
    let service = MovementService::new(store.clone(), Arc::new(NoopAuditSink));
    Fixture {
        store,
        service,
        equipment,
        actor: Uuid::new_v4(),
    }
}

pub fn request(
    movement_type: MovementType,
    equipment_type_id: Uuid,
    quantity: i64,
    endpoints: MovementEndpoints,
) -> MovementRequest {
    MovementRequest {
        movement_type,
        equipment_type_id,
        quantity,
        endpoints,
        reference: None,
        comment: None,
    }
}

pub fn key(kind: ContainerKind, container_id: Uuid, equipment_type_id: Uuid) -> BalanceKey {
    BalanceKey {
        kind,
        container_id,
        equipment_type_id,
    }
}
