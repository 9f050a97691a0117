mod common;

use proptest::prelude::*;

use common::{fixture, request};
use stockyard_core::{ContainerKind, MovementEndpoints, MovementType};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// For any sequence of movements over a small fixed world, every
    /// committed balance stays non-negative and the ledger holds exactly
    /// one row per accepted movement.
    #[test]
    fn balances_never_go_negative(
        steps in prop::collection::vec((0usize..10, 1i64..20), 1..40)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let f = fixture().await;
            let w1 = f.store.add_container(ContainerKind::Warehouse).await;
            let w2 = f.store.add_container(ContainerKind::Warehouse).await;
            let cabinet = f.store.add_container(ContainerKind::Cabinet).await;
            let assembly = f.store.add_container(ContainerKind::Assembly).await;

            let mut accepted = 0usize;
            for (type_index, quantity) in steps {
                let (movement_type, endpoints) = match type_index {
                    0 => (MovementType::Inbound, MovementEndpoints {
                        to_warehouse_id: Some(w1),
                        ..Default::default()
                    }),
                    1 => (MovementType::ToWarehouse, MovementEndpoints {
                        to_warehouse_id: Some(w2),
                        ..Default::default()
                    }),
                    2 => (MovementType::Transfer, MovementEndpoints {
                        from_warehouse_id: Some(w1),
                        to_warehouse_id: Some(w2),
                        ..Default::default()
                    }),
                    3 => (MovementType::ToCabinet, MovementEndpoints {
                        from_warehouse_id: Some(w1),
                        to_cabinet_id: Some(cabinet),
                        ..Default::default()
                    }),
                    4 => (MovementType::FromCabinet, MovementEndpoints {
                        from_cabinet_id: Some(cabinet),
                        to_warehouse_id: Some(w1),
                        ..Default::default()
                    }),
                    5 => (MovementType::DirectToCabinet, MovementEndpoints {
                        to_cabinet_id: Some(cabinet),
                        ..Default::default()
                    }),
                    6 => (MovementType::ToAssembly, MovementEndpoints {
                        to_assembly_id: Some(assembly),
                        ..Default::default()
                    }),
                    7 => (MovementType::DirectToAssembly, MovementEndpoints {
                        to_assembly_id: Some(assembly),
                        ..Default::default()
                    }),
                    8 => (MovementType::Writeoff, MovementEndpoints {
                        from_warehouse_id: Some(w1),
                        ..Default::default()
                    }),
                    _ => (MovementType::Adjustment, MovementEndpoints {
                        from_cabinet_id: Some(cabinet),
                        ..Default::default()
                    }),
                };

                let outcome = f
                    .service
                    .apply(
                        &request(movement_type, f.equipment, quantity, endpoints),
                        f.actor,
                    )
                    .await;
                if outcome.is_ok() {
                    accepted += 1;
                }

                for (key, balance) in f.store.balances_snapshot().await {
                    assert!(balance >= 0, "balance {balance} at {key:?} went negative");
                }
            }

            assert_eq!(f.store.movements().await.len(), accepted);
        });
    }
}
