use uuid::Uuid;

use stockyard_core::{
    MovementEndpoints, MovementError, MovementKind, MovementTx, MovementType, NewMovement,
};

/// A movement exactly as requested by a caller, endpoints still unchecked.
#[derive(Debug, Clone)]
pub struct MovementRequest {
    pub movement_type: MovementType,
    pub equipment_type_id: Uuid,
    pub quantity: i64,
    pub endpoints: MovementEndpoints,
    pub reference: Option<String>,
    pub comment: Option<String>,
}

/// A fully resolved movement, ready for the balance mutator.
#[derive(Debug, Clone)]
pub struct ValidatedMovement {
    pub kind: MovementKind,
    pub equipment_type_id: Uuid,
    pub quantity: i64,
    pub endpoints: MovementEndpoints,
    pub reference: Option<String>,
    pub comment: Option<String>,
}

impl ValidatedMovement {
    pub fn new_movement(&self, performed_by_id: Uuid) -> NewMovement {
        NewMovement {
            movement_type: self.kind.movement_type(),
            equipment_type_id: self.equipment_type_id,
            quantity: self.quantity,
            endpoints: self.endpoints,
            reference: self.reference.clone(),
            comment: self.comment.clone(),
            performed_by_id,
        }
    }
}

/// Check order: quantity, equipment type, every supplied endpoint, then
/// endpoint-combination legality. No side effects on balances.
pub async fn validate<T: MovementTx>(
    tx: &mut T,
    request: &MovementRequest,
) -> Result<ValidatedMovement, MovementError> {
    if request.quantity <= 0 {
        return Err(MovementError::invalid("quantity must be a positive integer"));
    }

    if !tx.equipment_type_live(request.equipment_type_id).await? {
        return Err(MovementError::not_found(
            "equipment type",
            request.equipment_type_id,
        ));
    }

    for (label, kind, id) in request.endpoints.supplied() {
        if !tx.container_live(kind, id).await? {
            return Err(MovementError::not_found(label, id));
        }
    }

    let kind = MovementKind::resolve(request.movement_type, &request.endpoints)?;

    Ok(ValidatedMovement {
        kind,
        equipment_type_id: request.equipment_type_id,
        quantity: request.quantity,
        endpoints: request.endpoints,
        reference: request.reference.clone(),
        comment: request.comment.clone(),
    })
}
