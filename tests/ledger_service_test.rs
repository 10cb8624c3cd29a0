mod common;

use labledger_api::entities::{
    inventory_audit::Entity as InventoryAuditEntity, inventory_change::Entity as ChangeEntity,
    inventory_item::Entity as ItemEntity,
};
use labledger_api::errors::ServiceError;
use labledger_api::services::audit::InventoryAuditQuery;
use labledger_api::services::ledger::{
    CreateItemRequest, ListChangesQuery, RecordChangeRequest, UpdateItemRequest,
    REASON_INITIAL_CREATION, REASON_MANUAL_UPDATE,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};

fn create_request(chemical_id: i32, location_id: i32, quantity: Decimal) -> CreateItemRequest {
    CreateItemRequest {
        chemical_id,
        location_id,
        quantity,
        unit: "g".into(),
        batch_number: "B-001".into(),
        expiration_date: None,
        supplier: None,
        acquisition_date: None,
    }
}

#[tokio::test]
async fn create_item_emits_opening_ledger_entry_and_create_audit() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;

    let item = ctx
        .services
        .ledger
        .create_item(create_request(chemical.id, location.id, dec!(100)), user.id)
        .await
        .expect("create item");

    assert_eq!(item.quantity, dec!(100));
    assert_eq!(item.unit, "g");

    let changes = ctx
        .services
        .ledger
        .list_changes(ListChangesQuery {
            inventory_item_id: Some(item.id),
            ..Default::default()
        })
        .await
        .expect("list changes");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].delta, dec!(100));
    assert_eq!(changes[0].reason, REASON_INITIAL_CREATION);
    assert_eq!(changes[0].user_id, user.id);

    let audits = ctx
        .services
        .audit
        .list_inventory_audits(InventoryAuditQuery {
            inventory_item_id: Some(item.id),
            ..Default::default()
        })
        .await
        .expect("list audits");
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "CREATE");
    assert_eq!(audits[0].old_value, "");
    assert!(audits[0].new_value.contains("\"quantity\":\"100\""));
}

#[tokio::test]
async fn create_item_with_unknown_chemical_persists_nothing() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;

    let result = ctx
        .services
        .ledger
        .create_item(create_request(9999, location.id, dec!(10)), user.id)
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));

    assert_eq!(ItemEntity::find().count(&*ctx.db).await.unwrap(), 0);
    assert_eq!(ChangeEntity::find().count(&*ctx.db).await.unwrap(), 0);
    assert_eq!(
        InventoryAuditEntity::find().count(&*ctx.db).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn record_change_applies_delta_and_appends_paired_rows() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;
    let item = ctx
        .services
        .ledger
        .create_item(create_request(chemical.id, location.id, dec!(100)), user.id)
        .await
        .unwrap();

    let (change, updated) = ctx
        .services
        .ledger
        .record_change(
            RecordChangeRequest {
                inventory_item_id: item.id,
                delta: dec!(-30),
                reason: "used in experiment E1".into(),
                experiment_id: None,
            },
            user.id,
        )
        .await
        .expect("record change");

    assert_eq!(change.delta, dec!(-30));
    assert_eq!(updated.quantity, dec!(70));

    let audits = ctx
        .services
        .audit
        .list_inventory_audits(InventoryAuditQuery {
            inventory_item_id: Some(item.id),
            field_name: Some("quantity".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].old_value, "100");
    assert_eq!(audits[0].new_value, "70");
    assert_eq!(audits[0].action, "UPDATE");
}

#[tokio::test]
async fn record_change_that_would_go_negative_leaves_no_trace() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;
    let item = ctx
        .services
        .ledger
        .create_item(create_request(chemical.id, location.id, dec!(70)), user.id)
        .await
        .unwrap();

    let changes_before = ChangeEntity::find().count(&*ctx.db).await.unwrap();
    let audits_before = InventoryAuditEntity::find().count(&*ctx.db).await.unwrap();

    let result = ctx
        .services
        .ledger
        .record_change(
            RecordChangeRequest {
                inventory_item_id: item.id,
                delta: dec!(-80),
                reason: "oops".into(),
                experiment_id: None,
            },
            user.id,
        )
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidState(_))));

    let unchanged = ctx.services.ledger.get_item(item.id).await.unwrap();
    assert_eq!(unchanged.quantity, dec!(70));
    assert_eq!(
        ChangeEntity::find().count(&*ctx.db).await.unwrap(),
        changes_before
    );
    assert_eq!(
        InventoryAuditEntity::find().count(&*ctx.db).await.unwrap(),
        audits_before
    );
}

#[tokio::test]
async fn record_change_with_unknown_experiment_persists_nothing() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;
    let item = ctx
        .services
        .ledger
        .create_item(create_request(chemical.id, location.id, dec!(50)), user.id)
        .await
        .unwrap();

    let result = ctx
        .services
        .ledger
        .record_change(
            RecordChangeRequest {
                inventory_item_id: item.id,
                delta: dec!(-10),
                reason: "consumed".into(),
                experiment_id: Some(4242),
            },
            user.id,
        )
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));

    let unchanged = ctx.services.ledger.get_item(item.id).await.unwrap();
    assert_eq!(unchanged.quantity, dec!(50));
}

#[tokio::test]
async fn record_change_resolves_experiment_reference() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "acetone").await;
    let location = common::seed_location(&ctx, user.id, "cabinet2").await;
    let experiment = common::seed_experiment(&ctx, user.id, "solvent study").await;
    let item = ctx
        .services
        .ledger
        .create_item(create_request(chemical.id, location.id, dec!(25)), user.id)
        .await
        .unwrap();

    let (change, updated) = ctx
        .services
        .ledger
        .record_change(
            RecordChangeRequest {
                inventory_item_id: item.id,
                delta: dec!(-5),
                reason: "consumed by experiment".into(),
                experiment_id: Some(experiment.id),
            },
            user.id,
        )
        .await
        .expect("record change");

    assert_eq!(change.experiment_id, Some(experiment.id));
    assert_eq!(updated.quantity, dec!(20));
}

#[tokio::test]
async fn update_item_batch_number_only_audits_one_field_and_no_change() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;
    let item = ctx
        .services
        .ledger
        .create_item(create_request(chemical.id, location.id, dec!(100)), user.id)
        .await
        .unwrap();

    let updated = ctx
        .services
        .ledger
        .update_item(
            item.id,
            UpdateItemRequest {
                batch_number: Some("B-002".into()),
                ..Default::default()
            },
            user.id,
        )
        .await
        .expect("update");
    assert_eq!(updated.batch_number, "B-002");

    let audits = ctx
        .services
        .audit
        .list_inventory_audits(InventoryAuditQuery {
            inventory_item_id: Some(item.id),
            action: Some("UPDATE".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].field_name, "batch_number");
    assert_eq!(audits[0].old_value, "B-001");
    assert_eq!(audits[0].new_value, "B-002");

    // Only the opening ledger entry exists
    let changes = ctx
        .services
        .ledger
        .list_changes(ListChangesQuery {
            inventory_item_id: Some(item.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(changes.len(), 1);
}

#[tokio::test]
async fn update_item_quantity_emits_exactly_one_change_and_one_audit() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;
    let item = ctx
        .services
        .ledger
        .create_item(create_request(chemical.id, location.id, dec!(100)), user.id)
        .await
        .unwrap();

    let updated = ctx
        .services
        .ledger
        .update_item(
            item.id,
            UpdateItemRequest {
                quantity: Some(dec!(60)),
                ..Default::default()
            },
            user.id,
        )
        .await
        .unwrap();
    assert_eq!(updated.quantity, dec!(60));

    let changes = ctx
        .services
        .ledger
        .list_changes(ListChangesQuery {
            inventory_item_id: Some(item.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(changes.len(), 2);
    // Newest first
    assert_eq!(changes[0].delta, dec!(-40));
    assert_eq!(changes[0].reason, REASON_MANUAL_UPDATE);

    let audits = ctx
        .services
        .audit
        .list_inventory_audits(InventoryAuditQuery {
            inventory_item_id: Some(item.id),
            field_name: Some("quantity".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].old_value, "100");
    assert_eq!(audits[0].new_value, "60");
}

#[tokio::test]
async fn ledger_deltas_always_sum_to_current_quantity() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;
    let item = ctx
        .services
        .ledger
        .create_item(create_request(chemical.id, location.id, dec!(100)), user.id)
        .await
        .unwrap();

    for delta in [dec!(-30), dec!(15), dec!(-55), dec!(-30), dec!(2.5)] {
        // Some of these may be rejected; either way the invariant must hold
        let _ = ctx
            .services
            .ledger
            .record_change(
                RecordChangeRequest {
                    inventory_item_id: item.id,
                    delta,
                    reason: "reconciliation walk".into(),
                    experiment_id: None,
                },
                user.id,
            )
            .await;

        let current = ctx.services.ledger.get_item(item.id).await.unwrap();
        let changes = ctx
            .services
            .ledger
            .list_changes(ListChangesQuery {
                inventory_item_id: Some(item.id),
                ..Default::default()
            })
            .await
            .unwrap();
        let sum: Decimal = changes.iter().map(|c| c.delta).sum();
        assert_eq!(sum, current.quantity);
        assert!(current.quantity >= Decimal::ZERO);
    }
}

/// The concrete walk-through from the design discussion: create at 100 g,
/// consume 30, then fail to consume 80.
#[tokio::test]
async fn ethanol_scenario_end_to_end() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let ethanol = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let shelf_a = common::seed_location(&ctx, user.id, "shelfA").await;

    let item = ctx
        .services
        .ledger
        .create_item(create_request(ethanol.id, shelf_a.id, dec!(100)), user.id)
        .await
        .unwrap();
    assert_eq!(item.quantity, dec!(100));

    let (_, item_after) = ctx
        .services
        .ledger
        .record_change(
            RecordChangeRequest {
                inventory_item_id: item.id,
                delta: dec!(-30),
                reason: "used in experiment E1".into(),
                experiment_id: None,
            },
            user.id,
        )
        .await
        .unwrap();
    assert_eq!(item_after.quantity, dec!(70));

    let overdraw = ctx
        .services
        .ledger
        .record_change(
            RecordChangeRequest {
                inventory_item_id: item.id,
                delta: dec!(-80),
                reason: "oops".into(),
                experiment_id: None,
            },
            user.id,
        )
        .await;
    assert!(matches!(overdraw, Err(ServiceError::InvalidState(_))));

    let settled = ctx.services.ledger.get_item(item.id).await.unwrap();
    assert_eq!(settled.quantity, dec!(70));
}
