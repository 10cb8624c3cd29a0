mod common;

use std::time::Duration;

use labledger_api::services::ledger::{CreateItemRequest, RecordChangeRequest};
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn next_message(rx: &mut mpsc::UnboundedReceiver<String>) -> serde_json::Value {
    let raw = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("fan-out within deadline")
        .expect("channel open");
    serde_json::from_str(&raw).expect("valid JSON frame")
}

/// Committed ledger mutations reach inventory subscribers in commit order,
/// while unrelated resources stay quiet.
#[tokio::test]
async fn ledger_commits_fan_out_to_inventory_subscribers() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = ctx.hub.register(tx);
    ctx.hub.subscribe(conn, "inventory");

    let item = ctx
        .services
        .ledger
        .create_item(
            CreateItemRequest {
                chemical_id: chemical.id,
                location_id: location.id,
                quantity: dec!(100),
                unit: "g".into(),
                batch_number: "B-001".into(),
                expiration_date: None,
                supplier: None,
                acquisition_date: None,
            },
            user.id,
        )
        .await
        .unwrap();

    let created = next_message(&mut rx).await;
    assert_eq!(created["type"], "inventory_updated");
    assert_eq!(created["action"], "create");
    assert_eq!(created["resource"], "inventory");
    assert_eq!(created["data"]["id"], item.id);
    assert_eq!(created["data"]["quantity"], "100");

    ctx.services
        .ledger
        .record_change(
            RecordChangeRequest {
                inventory_item_id: item.id,
                delta: dec!(-30),
                reason: "consumed".into(),
                experiment_id: None,
            },
            user.id,
        )
        .await
        .unwrap();

    let updated = next_message(&mut rx).await;
    assert_eq!(updated["action"], "update");
    assert_eq!(updated["data"]["quantity"], "70");
}

/// A failed mutation never reaches subscribers.
#[tokio::test]
async fn rejected_mutations_do_not_fan_out() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "ethanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfA").await;
    let item = ctx
        .services
        .ledger
        .create_item(
            CreateItemRequest {
                chemical_id: chemical.id,
                location_id: location.id,
                quantity: dec!(10),
                unit: "g".into(),
                batch_number: "B-001".into(),
                expiration_date: None,
                supplier: None,
                acquisition_date: None,
            },
            user.id,
        )
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = ctx.hub.register(tx);
    ctx.hub.subscribe(conn, "inventory");

    let overdraw = ctx
        .services
        .ledger
        .record_change(
            RecordChangeRequest {
                inventory_item_id: item.id,
                delta: dec!(-99),
                reason: "overdraw".into(),
                experiment_id: None,
            },
            user.id,
        )
        .await;
    assert!(overdraw.is_err());

    // Give the fan-out task a beat; nothing should arrive
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
}

/// Location mutations publish on their own resource, not on inventory.
#[tokio::test]
async fn location_mutations_publish_to_locations_resource() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = ctx.hub.register(tx);
    ctx.hub.subscribe(conn, "locations");

    let location = common::seed_location(&ctx, user.id, "coldroom").await;

    let created = next_message(&mut rx).await;
    assert_eq!(created["type"], "locations_updated");
    assert_eq!(created["action"], "create");
    assert_eq!(created["data"]["name"], "coldroom");
    assert_eq!(created["data"]["id"], location.id);
}
