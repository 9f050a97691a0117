//! Postgres implementation of the movement storage traits. Balance
//! mutation is an explicit upsert-then-lock: insert the row at zero if
//! absent, `SELECT .. FOR UPDATE`, then write the new quantity. The
//! database carries its own `CHECK (quantity >= 0)` behind the
//! application-level conflict check.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use stockyard_core::{
    BalanceKey, ContainerKind, EquipmentMovement, MovementError, MovementStore, MovementTx,
    NewMovement,
};

#[derive(Clone)]
pub struct PgMovementStore {
    pool: PgPool,
}

impl PgMovementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgMovementTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl MovementStore for PgMovementStore {
    type Tx = PgMovementTx;

    async fn begin(&self) -> Result<Self::Tx, MovementError> {
        let tx = self.pool.begin().await.map_err(classify)?;
        Ok(PgMovementTx { tx })
    }
}

fn stock_table(kind: ContainerKind) -> (&'static str, &'static str) {
    match kind {
        ContainerKind::Warehouse => ("warehouse_stock", "warehouse_id"),
        ContainerKind::Cabinet => ("cabinet_stock", "cabinet_id"),
        ContainerKind::Assembly => ("assembly_stock", "assembly_id"),
    }
}

fn container_table(kind: ContainerKind) -> &'static str {
    match kind {
        ContainerKind::Warehouse => "warehouses",
        ContainerKind::Cabinet => "cabinets",
        ContainerKind::Assembly => "assemblies",
    }
}

/// Serialization failures, deadlocks, and lock timeouts are the retryable
/// class; everything else is a hard storage error.
fn classify(err: sqlx::Error) -> MovementError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(code) = db_err.code() {
            if matches!(code.as_ref(), "40001" | "40P01" | "55P03") {
                return MovementError::Transient(db_err.to_string());
            }
        }
    }
    MovementError::Storage(err.into())
}

#[async_trait]
impl MovementTx for PgMovementTx {
    async fn equipment_type_live(&mut self, id: Uuid) -> Result<bool, MovementError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM equipment_types WHERE id = $1 AND is_deleted = FALSE) AS live",
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(classify)?;
        row.try_get("live").map_err(classify)
    }

    async fn container_live(
        &mut self,
        kind: ContainerKind,
        id: Uuid,
    ) -> Result<bool, MovementError> {
        let query = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND is_deleted = FALSE) AS live",
            container_table(kind)
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(classify)?;
        row.try_get("live").map_err(classify)
    }

    async fn apply_delta(&mut self, key: &BalanceKey, delta: i64) -> Result<i64, MovementError> {
        let (table, container_column) = stock_table(key.kind);
        let now = Utc::now();

        let insert = format!(
            r#"
            INSERT INTO {table} (id, {container_column}, equipment_type_id, quantity, last_updated)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT ({container_column}, equipment_type_id) DO NOTHING
            "#
        );
        sqlx::query(&insert)
            .bind(Uuid::new_v4())
            .bind(key.container_id)
            .bind(key.equipment_type_id)
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;

        let lock = format!(
            r#"
            SELECT quantity FROM {table}
            WHERE {container_column} = $1 AND equipment_type_id = $2
            FOR UPDATE
            "#
        );
        let row = sqlx::query(&lock)
            .bind(key.container_id)
            .bind(key.equipment_type_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(classify)?;
        let current: i64 = row.try_get("quantity").map_err(classify)?;

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

        let update = format!(
            r#"
            UPDATE {table}
            SET quantity = $3, last_updated = $4
            WHERE {container_column} = $1 AND equipment_type_id = $2
            "#
        );
        sqlx::query(&update)
            .bind(key.container_id)
            .bind(key.equipment_type_id)
            .bind(new_quantity)
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;

        Ok(new_quantity)
    }

    async fn append_movement(
        &mut self,
        movement: &NewMovement,
    ) -> Result<EquipmentMovement, MovementError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO equipment_movements (
                id, movement_type, equipment_type_id, quantity,
                from_warehouse_id, to_warehouse_id, from_cabinet_id, to_cabinet_id, to_assembly_id,
                reference, comment, performed_by_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(id)
        .bind(movement.movement_type.as_str())
        .bind(movement.equipment_type_id)
        .bind(movement.quantity)
        .bind(movement.endpoints.from_warehouse_id)
        .bind(movement.endpoints.to_warehouse_id)
        .bind(movement.endpoints.from_cabinet_id)
        .bind(movement.endpoints.to_cabinet_id)
        .bind(movement.endpoints.to_assembly_id)
        .bind(movement.reference.as_deref())
        .bind(movement.comment.as_deref())
        .bind(movement.performed_by_id)
        .bind(created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;

        Ok(EquipmentMovement {
            id,
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
            created_at,
        })
    }

    async fn commit(self) -> Result<(), MovementError> {
        self.tx.commit().await.map_err(classify)
    }
}
