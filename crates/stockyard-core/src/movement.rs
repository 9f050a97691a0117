use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MovementError;
use crate::models::ContainerKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Inbound,
    ToWarehouse,
    Transfer,
    ToCabinet,
    FromCabinet,
    DirectToCabinet,
    ToAssembly,
    DirectToAssembly,
    Writeoff,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inbound => "inbound",
            MovementType::ToWarehouse => "to_warehouse",
            MovementType::Transfer => "transfer",
            MovementType::ToCabinet => "to_cabinet",
            MovementType::FromCabinet => "from_cabinet",
            MovementType::DirectToCabinet => "direct_to_cabinet",
            MovementType::ToAssembly => "to_assembly",
            MovementType::DirectToAssembly => "direct_to_assembly",
            MovementType::Writeoff => "writeoff",
            MovementType::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementType {
    type Err = MovementError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inbound" => Ok(MovementType::Inbound),
            "to_warehouse" => Ok(MovementType::ToWarehouse),
            "transfer" => Ok(MovementType::Transfer),
            "to_cabinet" => Ok(MovementType::ToCabinet),
            "from_cabinet" => Ok(MovementType::FromCabinet),
            "direct_to_cabinet" => Ok(MovementType::DirectToCabinet),
            "to_assembly" => Ok(MovementType::ToAssembly),
            "direct_to_assembly" => Ok(MovementType::DirectToAssembly),
            "writeoff" => Ok(MovementType::Writeoff),
            "adjustment" => Ok(MovementType::Adjustment),
            other => Err(MovementError::invalid(format!(
                "unknown movement type {other}"
            ))),
        }
    }
}

/// The optional endpoint ids exactly as they arrive on a request. The
/// movement type decides which of them drive balance deltas; all supplied
/// ids are existence-checked and recorded on the ledger row regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementEndpoints {
    pub from_warehouse_id: Option<Uuid>,
    pub to_warehouse_id: Option<Uuid>,
    pub from_cabinet_id: Option<Uuid>,
    pub to_cabinet_id: Option<Uuid>,
    pub to_assembly_id: Option<Uuid>,
}

impl MovementEndpoints {
    /// Every supplied endpoint with its expected container kind and the
    /// label used in not-found errors.
    pub fn supplied(&self) -> Vec<(&'static str, ContainerKind, Uuid)> {
        let mut out = Vec::new();
        if let Some(id) = self.from_warehouse_id {
            out.push(("source warehouse", ContainerKind::Warehouse, id));
        }
        if let Some(id) = self.to_warehouse_id {
            out.push(("destination warehouse", ContainerKind::Warehouse, id));
        }
        if let Some(id) = self.from_cabinet_id {
            out.push(("source cabinet", ContainerKind::Cabinet, id));
        }
        if let Some(id) = self.to_cabinet_id {
            out.push(("destination cabinet", ContainerKind::Cabinet, id));
        }
        if let Some(id) = self.to_assembly_id {
            out.push(("assembly", ContainerKind::Assembly, id));
        }
        out
    }
}

/// Single debited container for a writeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockSource {
    Warehouse(Uuid),
    Cabinet(Uuid),
}

/// The one endpoint of an adjustment. From-side always debits, to-side
/// always credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentSide {
    FromWarehouse(Uuid),
    FromCabinet(Uuid),
    ToWarehouse(Uuid),
    ToCabinet(Uuid),
}

/// A movement with its endpoint arity already proven: each variant's
/// payload carries exactly the endpoints its type uses, so the mutator
/// never sees an ill-formed combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementKind {
    Inbound { to_warehouse: Uuid },
    ToWarehouse { to_warehouse: Uuid },
    Transfer { from_warehouse: Uuid, to_warehouse: Uuid },
    ToCabinet { from_warehouse: Uuid, to_cabinet: Uuid },
    FromCabinet { from_cabinet: Uuid, to_warehouse: Uuid },
    DirectToCabinet { to_cabinet: Uuid },
    ToAssembly { to_assembly: Uuid },
    DirectToAssembly { to_assembly: Uuid },
    Writeoff { source: StockSource },
    Adjustment { side: AdjustmentSide },
}

impl MovementKind {
    pub fn resolve(
        movement_type: MovementType,
        endpoints: &MovementEndpoints,
    ) -> Result<Self, MovementError> {
        match movement_type {
            MovementType::Inbound => Ok(MovementKind::Inbound {
                to_warehouse: require(endpoints.to_warehouse_id, "to_warehouse_id", "inbound")?,
            }),
            MovementType::ToWarehouse => Ok(MovementKind::ToWarehouse {
                to_warehouse: require(
                    endpoints.to_warehouse_id,
                    "to_warehouse_id",
                    "to_warehouse",
                )?,
            }),
            MovementType::Transfer => Ok(MovementKind::Transfer {
                from_warehouse: require(
                    endpoints.from_warehouse_id,
                    "from_warehouse_id",
                    "transfer",
                )?,
                to_warehouse: require(endpoints.to_warehouse_id, "to_warehouse_id", "transfer")?,
            }),
            MovementType::ToCabinet => Ok(MovementKind::ToCabinet {
                from_warehouse: require(
                    endpoints.from_warehouse_id,
                    "from_warehouse_id",
                    "to_cabinet",
                )?,
                to_cabinet: require(endpoints.to_cabinet_id, "to_cabinet_id", "to_cabinet")?,
            }),
            MovementType::FromCabinet => Ok(MovementKind::FromCabinet {
                from_cabinet: require(
                    endpoints.from_cabinet_id,
                    "from_cabinet_id",
                    "from_cabinet",
                )?,
                to_warehouse: require(
                    endpoints.to_warehouse_id,
                    "to_warehouse_id",
                    "from_cabinet",
                )?,
            }),
            MovementType::DirectToCabinet => Ok(MovementKind::DirectToCabinet {
                to_cabinet: require(endpoints.to_cabinet_id, "to_cabinet_id", "direct_to_cabinet")?,
            }),
            MovementType::ToAssembly => Ok(MovementKind::ToAssembly {
                to_assembly: require(endpoints.to_assembly_id, "to_assembly_id", "to_assembly")?,
            }),
            MovementType::DirectToAssembly => Ok(MovementKind::DirectToAssembly {
                to_assembly: require(
                    endpoints.to_assembly_id,
                    "to_assembly_id",
                    "direct_to_assembly",
                )?,
            }),
            MovementType::Writeoff => {
                match (endpoints.from_warehouse_id, endpoints.from_cabinet_id) {
                    (Some(_), Some(_)) => Err(MovementError::invalid(
                        "choose warehouse or cabinet for writeoff",
                    )),
                    (Some(id), None) => Ok(MovementKind::Writeoff {
                        source: StockSource::Warehouse(id),
                    }),
                    (None, Some(id)) => Ok(MovementKind::Writeoff {
                        source: StockSource::Cabinet(id),
                    }),
                    (None, None) => Err(MovementError::invalid(
                        "from_warehouse_id or from_cabinet_id is required for writeoff",
                    )),
                }
            }
            MovementType::Adjustment => {
                let mut sides = Vec::new();
                if let Some(id) = endpoints.from_warehouse_id {
                    sides.push(AdjustmentSide::FromWarehouse(id));
                }
                if let Some(id) = endpoints.from_cabinet_id {
                    sides.push(AdjustmentSide::FromCabinet(id));
                }
                if let Some(id) = endpoints.to_warehouse_id {
                    sides.push(AdjustmentSide::ToWarehouse(id));
                }
                if let Some(id) = endpoints.to_cabinet_id {
                    sides.push(AdjustmentSide::ToCabinet(id));
                }
                if sides.len() != 1 {
                    return Err(MovementError::invalid(
                        "adjustment requires exactly one target",
                    ));
                }
                Ok(MovementKind::Adjustment { side: sides[0] })
            }
        }
    }

    pub fn movement_type(&self) -> MovementType {
        match self {
            MovementKind::Inbound { .. } => MovementType::Inbound,
            MovementKind::ToWarehouse { .. } => MovementType::ToWarehouse,
            MovementKind::Transfer { .. } => MovementType::Transfer,
            MovementKind::ToCabinet { .. } => MovementType::ToCabinet,
            MovementKind::FromCabinet { .. } => MovementType::FromCabinet,
            MovementKind::DirectToCabinet { .. } => MovementType::DirectToCabinet,
            MovementKind::ToAssembly { .. } => MovementType::ToAssembly,
            MovementKind::DirectToAssembly { .. } => MovementType::DirectToAssembly,
            MovementKind::Writeoff { .. } => MovementType::Writeoff,
            MovementKind::Adjustment { .. } => MovementType::Adjustment,
        }
    }

    /// The signed balance deltas this movement applies, pre-sorted into the
    /// fixed lock order (container kind, container id, equipment type id).
    pub fn deltas(&self, equipment_type_id: Uuid, quantity: i64) -> Vec<BalanceDelta> {
        let key = |kind: ContainerKind, container_id: Uuid| BalanceKey {
            kind,
            container_id,
            equipment_type_id,
        };
        let mut deltas = match *self {
            MovementKind::Inbound { to_warehouse } | MovementKind::ToWarehouse { to_warehouse } => {
                vec![BalanceDelta {
                    key: key(ContainerKind::Warehouse, to_warehouse),
                    delta: quantity,
                }]
            }
            MovementKind::Transfer {
                from_warehouse,
                to_warehouse,
            } => vec![
                BalanceDelta {
                    key: key(ContainerKind::Warehouse, from_warehouse),
                    delta: -quantity,
                },
                BalanceDelta {
                    key: key(ContainerKind::Warehouse, to_warehouse),
                    delta: quantity,
                },
            ],
            MovementKind::ToCabinet {
                from_warehouse,
                to_cabinet,
            } => vec![
                BalanceDelta {
                    key: key(ContainerKind::Warehouse, from_warehouse),
                    delta: -quantity,
                },
                BalanceDelta {
                    key: key(ContainerKind::Cabinet, to_cabinet),
                    delta: quantity,
                },
            ],
            MovementKind::FromCabinet {
                from_cabinet,
                to_warehouse,
            } => vec![
                BalanceDelta {
                    key: key(ContainerKind::Cabinet, from_cabinet),
                    delta: -quantity,
                },
                BalanceDelta {
                    key: key(ContainerKind::Warehouse, to_warehouse),
                    delta: quantity,
                },
            ],
            MovementKind::DirectToCabinet { to_cabinet } => vec![BalanceDelta {
                key: key(ContainerKind::Cabinet, to_cabinet),
                delta: quantity,
            }],
            MovementKind::ToAssembly { to_assembly }
            | MovementKind::DirectToAssembly { to_assembly } => vec![BalanceDelta {
                key: key(ContainerKind::Assembly, to_assembly),
                delta: quantity,
            }],
            MovementKind::Writeoff { source } => {
                let (kind, container_id) = match source {
                    StockSource::Warehouse(id) => (ContainerKind::Warehouse, id),
                    StockSource::Cabinet(id) => (ContainerKind::Cabinet, id),
                };
                vec![BalanceDelta {
                    key: key(kind, container_id),
                    delta: -quantity,
                }]
            }
            MovementKind::Adjustment { side } => {
                let (kind, container_id, delta) = match side {
                    AdjustmentSide::FromWarehouse(id) => {
                        (ContainerKind::Warehouse, id, -quantity)
                    }
                    AdjustmentSide::FromCabinet(id) => (ContainerKind::Cabinet, id, -quantity),
                    AdjustmentSide::ToWarehouse(id) => (ContainerKind::Warehouse, id, quantity),
                    AdjustmentSide::ToCabinet(id) => (ContainerKind::Cabinet, id, quantity),
                };
                vec![BalanceDelta {
                    key: key(kind, container_id),
                    delta,
                }]
            }
        };
        deltas.sort_by(|a, b| a.key.cmp(&b.key));
        deltas
    }
}

fn require(
    id: Option<Uuid>,
    field: &'static str,
    movement_type: &'static str,
) -> Result<Uuid, MovementError> {
    id.ok_or_else(|| MovementError::invalid(format!("{field} is required for {movement_type}")))
}

/// Composite key of one stock balance row. The derived ordering is the
/// lock-acquisition order for multi-key movements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BalanceKey {
    pub kind: ContainerKind,
    pub container_id: Uuid,
    pub equipment_type_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDelta {
    pub key: BalanceKey,
    pub delta: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> MovementEndpoints {
        MovementEndpoints::default()
    }

    #[test]
    fn writeoff_with_both_sources_is_rejected() {
        let eps = MovementEndpoints {
            from_warehouse_id: Some(Uuid::new_v4()),
            from_cabinet_id: Some(Uuid::new_v4()),
            ..endpoints()
        };
        let err = MovementKind::resolve(MovementType::Writeoff, &eps).unwrap_err();
        assert!(matches!(err, MovementError::InvalidRequest(_)));
    }

    #[test]
    fn writeoff_with_no_source_is_rejected() {
        let err = MovementKind::resolve(MovementType::Writeoff, &endpoints()).unwrap_err();
        assert!(matches!(err, MovementError::InvalidRequest(_)));
    }

    #[test]
    fn adjustment_requires_exactly_one_target() {
        let err = MovementKind::resolve(MovementType::Adjustment, &endpoints()).unwrap_err();
        assert!(matches!(err, MovementError::InvalidRequest(_)));

        let eps = MovementEndpoints {
            from_warehouse_id: Some(Uuid::new_v4()),
            to_cabinet_id: Some(Uuid::new_v4()),
            ..endpoints()
        };
        let err = MovementKind::resolve(MovementType::Adjustment, &eps).unwrap_err();
        assert!(matches!(err, MovementError::InvalidRequest(_)));
    }

    #[test]
    fn adjustment_from_side_debits_and_to_side_credits() {
        let equipment = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        let from = MovementKind::Adjustment {
            side: AdjustmentSide::FromWarehouse(warehouse),
        };
        assert_eq!(from.deltas(equipment, 4)[0].delta, -4);

        let to = MovementKind::Adjustment {
            side: AdjustmentSide::ToWarehouse(warehouse),
        };
        assert_eq!(to.deltas(equipment, 4)[0].delta, 4);
    }

    #[test]
    fn transfer_deltas_come_out_in_lock_order() {
        let equipment = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };

        let kind = MovementKind::Transfer {
            from_warehouse: hi,
            to_warehouse: lo,
        };
        let deltas = kind.deltas(equipment, 7);
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].key.container_id, lo);
        assert_eq!(deltas[1].key.container_id, hi);
        assert_eq!(deltas.iter().map(|d| d.delta).sum::<i64>(), 0);
    }

    #[test]
    fn cross_kind_deltas_lock_warehouse_before_cabinet() {
        let equipment = Uuid::new_v4();
        let kind = MovementKind::ToCabinet {
            from_warehouse: Uuid::new_v4(),
            to_cabinet: Uuid::new_v4(),
        };
        let deltas = kind.deltas(equipment, 1);
        assert_eq!(deltas[0].key.kind, ContainerKind::Warehouse);
        assert_eq!(deltas[1].key.kind, ContainerKind::Cabinet);
    }

    #[test]
    fn assembly_movements_credit_the_assembly() {
        let equipment = Uuid::new_v4();
        let assembly = Uuid::new_v4();
        for kind in [
            MovementKind::ToAssembly {
                to_assembly: assembly,
            },
            MovementKind::DirectToAssembly {
                to_assembly: assembly,
            },
        ] {
            let deltas = kind.deltas(equipment, 2);
            assert_eq!(deltas.len(), 1);
            assert_eq!(deltas[0].key.kind, ContainerKind::Assembly);
            assert_eq!(deltas[0].delta, 2);
        }
    }

    #[test]
    fn movement_type_round_trips_through_str() {
        for raw in [
            "inbound",
            "to_warehouse",
            "transfer",
            "to_cabinet",
            "from_cabinet",
            "direct_to_cabinet",
            "to_assembly",
            "direct_to_assembly",
            "writeoff",
            "adjustment",
        ] {
            let parsed: MovementType = raw.parse().unwrap();
            assert_eq!(parsed.as_str(), raw);
        }
        assert!("disposal".parse::<MovementType>().is_err());
    }
}
