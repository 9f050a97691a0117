use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::warn;
use uuid::Uuid;

use stockyard_core::{AuditSink, EquipmentMovement, MovementError, MovementStore, MovementTx};

use crate::validate::{MovementRequest, validate};

const MAX_ATTEMPTS: u32 = 3;

/// The sole public entry point for mutating stock. One call is one
/// transaction: validate, apply deltas in lock order, append the ledger
/// row, commit. Business errors surface immediately; only transient
/// storage failures are retried, and always by re-running the whole
/// operation.
pub struct MovementService<S: MovementStore> {
    store: S,
    audit: Arc<dyn AuditSink>,
    timeout: Option<Duration>,
}

impl<S: MovementStore> MovementService<S> {
    pub fn new(store: S, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            audit,
            timeout: None,
        }
    }

    /// Bound each attempt; an elapsed timeout aborts the transaction and is
    /// surfaced as a storage error, never retried.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn apply(
        &self,
        request: &MovementRequest,
        performed_by_id: Uuid,
    ) -> Result<EquipmentMovement, MovementError> {
        let mut attempt = 1;
        loop {
            let outcome = match self.timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.apply_once(request, performed_by_id))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(MovementError::Storage(anyhow!(
                            "movement aborted after {limit:?}"
                        ))),
                    }
                }
                None => self.apply_once(request, performed_by_id).await,
            };

            match outcome {
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        movement_type = %request.movement_type,
                        attempt,
                        "retrying movement after transient storage failure: {err}"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn apply_once(
        &self,
        request: &MovementRequest,
        performed_by_id: Uuid,
    ) -> Result<EquipmentMovement, MovementError> {
        let mut tx = self.store.begin().await?;

        let validated = validate(&mut tx, request).await?;
        for delta in validated
            .kind
            .deltas(validated.equipment_type_id, validated.quantity)
        {
            tx.apply_delta(&delta.key, delta.delta).await?;
        }
        let record = tx
            .append_movement(&validated.new_movement(performed_by_id))
            .await?;
        tx.commit().await?;

        if let Err(err) = self.audit.movement_recorded(&record).await {
            warn!("failed to publish audit event for movement {}: {err}", record.id);
        }

        Ok(record)
    }
}
