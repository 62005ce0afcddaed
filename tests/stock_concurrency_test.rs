mod common;

use common::*;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use sitestock_api::{
    entities::stock_transaction::{self, Entity as StockTransactions, MovementType},
    errors::ServiceError,
    services::stock::{RecordMovementCommand, RegisterStockCommand},
};
use uuid::Uuid;

fn out_movement(material_id: Uuid, warehouse_id: Uuid, quantity: i32) -> RecordMovementCommand {
    RecordMovementCommand {
        movement_type: MovementType::Out,
        material_id,
        warehouse_id,
        quantity,
        unit_price: None,
        supplier_id: None,
        project_id: None,
        notes: None,
        user_id: Uuid::new_v4(),
    }
}

// Twenty concurrent single-unit issues against a stock of ten: exactly ten
// succeed, the rest fail with InsufficientStock, and the level lands on zero.
#[tokio::test]
async fn concurrent_issues_never_overdraw() {
    let db = setup_db().await;
    let svc = stock_service(db.clone());

    let m = create_test_material(&db, "Anchor bolts").await;
    let w = create_test_warehouse(&db, "Depot").await;

    svc.register_initial_stock(RegisterStockCommand {
        material_id: m.id,
        warehouse_id: w.id,
        current_stock: 10,
        safety_stock: 0,
        unit_price: None,
        user_id: Uuid::new_v4(),
    })
    .await
    .expect("seed");

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let svc = svc.clone();
        let material_id = m.id;
        let warehouse_id = w.id;
        tasks.push(tokio::spawn(async move {
            svc.record_movement(out_movement(material_id, warehouse_id, 1))
                .await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for task in tasks {
        match task.await.expect("task") {
            Ok(_) => successes += 1,
            Err(ServiceError::InsufficientStock(_)) => insufficient += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(successes, 10, "exactly 10 issues should succeed");
    assert_eq!(insufficient, 10);

    let level = sitestock_api::entities::stock_level::Entity::find()
        .filter(sitestock_api::entities::stock_level::Column::MaterialId.eq(m.id))
        .one(db.as_ref())
        .await
        .expect("query")
        .expect("level");
    assert_eq!(level.current_stock, 0);

    // One ledger row per successful movement, none for the rejected ones
    let transactions = StockTransactions::find()
        .filter(stock_transaction::Column::MaterialId.eq(m.id))
        .count(db.as_ref())
        .await
        .expect("count");
    assert_eq!(transactions, 10);
}

// Two racing issues for the entire remaining quantity: at most one wins.
#[tokio::test]
async fn racing_full_drains_cannot_both_succeed() {
    let db = setup_db().await;
    let svc = stock_service(db.clone());

    let m = create_test_material(&db, "Scaffold clamps").await;
    let w = create_test_warehouse(&db, "Depot").await;

    svc.register_initial_stock(RegisterStockCommand {
        material_id: m.id,
        warehouse_id: w.id,
        current_stock: 5,
        safety_stock: 0,
        unit_price: None,
        user_id: Uuid::new_v4(),
    })
    .await
    .expect("seed");

    let a = {
        let svc = svc.clone();
        let (material_id, warehouse_id) = (m.id, w.id);
        tokio::spawn(
            async move { svc.record_movement(out_movement(material_id, warehouse_id, 5)).await },
        )
    };
    let b = {
        let svc = svc.clone();
        let (material_id, warehouse_id) = (m.id, w.id);
        tokio::spawn(
            async move { svc.record_movement(out_movement(material_id, warehouse_id, 5)).await },
        )
    };

    let results = [a.await.expect("join"), b.await.expect("join")];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one drain may succeed");

    for result in results {
        if let Err(e) = result {
            assert!(
                matches!(e, ServiceError::InsufficientStock(_)),
                "loser must see InsufficientStock, got {}",
                e
            );
        }
    }

    let level = sitestock_api::entities::stock_level::Entity::find()
        .filter(sitestock_api::entities::stock_level::Column::MaterialId.eq(m.id))
        .one(db.as_ref())
        .await
        .expect("query")
        .expect("level");
    assert_eq!(level.current_stock, 0);
}

// Interleaved receipts and issues across tasks still reconcile with the
// signed transaction sum.
#[tokio::test]
async fn concurrent_mixed_movements_stay_consistent() {
    let db = setup_db().await;
    let svc = stock_service(db.clone());

    let m = create_test_material(&db, "Conduit").await;
    let w = create_test_warehouse(&db, "Depot").await;

    svc.register_initial_stock(RegisterStockCommand {
        material_id: m.id,
        warehouse_id: w.id,
        current_stock: 100,
        safety_stock: 0,
        unit_price: None,
        user_id: Uuid::new_v4(),
    })
    .await
    .expect("seed");

    let mut tasks = Vec::new();
    for i in 0..30 {
        let svc = svc.clone();
        let (material_id, warehouse_id) = (m.id, w.id);
        tasks.push(tokio::spawn(async move {
            let cmd = if i % 2 == 0 {
                RecordMovementCommand {
                    movement_type: MovementType::In,
                    quantity: 3,
                    ..out_movement(material_id, warehouse_id, 0)
                }
            } else {
                out_movement(material_id, warehouse_id, 2)
            };
            svc.record_movement(cmd).await
        }));
    }

    for task in tasks {
        task.await.expect("task").expect("movement");
    }

    let transactions = StockTransactions::find()
        .filter(stock_transaction::Column::MaterialId.eq(m.id))
        .all(db.as_ref())
        .await
        .expect("transactions");
    let signed_sum: i32 = transactions
        .iter()
        .map(|t| t.quantity * t.movement_type.signum())
        .sum();

    let level = sitestock_api::entities::stock_level::Entity::find()
        .filter(sitestock_api::entities::stock_level::Column::MaterialId.eq(m.id))
        .one(db.as_ref())
        .await
        .expect("query")
        .expect("level");

    assert_eq!(level.current_stock, 100 + signed_sum);
    assert_eq!(level.current_stock, 100 + 15 * 3 - 15 * 2);
}
