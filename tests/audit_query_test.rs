mod common;

use labledger_api::errors::ServiceError;
use labledger_api::services::audit::{ChemicalAuditQuery, LocationAuditQuery};
use labledger_api::services::chemicals::UpdateChemicalRequest;
use labledger_api::services::locations::{CreateLocationRequest, UpdateLocationRequest};

#[tokio::test]
async fn location_mutations_build_a_filtered_queryable_trail() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let location = common::seed_location(&ctx, user.id, "fridge1").await;

    ctx.services
        .locations
        .update(
            location.id,
            UpdateLocationRequest {
                name: Some("fridge1b".into()),
                description: None,
            },
            user.id,
        )
        .await
        .expect("update location");

    // All rows for the location, newest first
    let all = ctx
        .services
        .audit
        .list_location_audits(LocationAuditQuery {
            location_id: Some(location.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all
        .windows(2)
        .all(|pair| pair[0].timestamp >= pair[1].timestamp));
    assert_eq!(all[0].action, "UPDATE");
    assert_eq!(all[0].old_value, "fridge1");
    assert_eq!(all[0].new_value, "fridge1b");

    // Action filter narrows to the creation row
    let created = ctx
        .services
        .audit
        .list_location_audits(LocationAuditQuery {
            location_id: Some(location.id),
            action: Some("CREATE".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].field_name, "name");

    // Actor filter
    let by_actor = ctx
        .services
        .audit
        .list_location_audits(LocationAuditQuery {
            user_id: Some(user.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_actor.len(), 2);
}

#[tokio::test]
async fn filters_matching_nothing_return_an_empty_list() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    common::seed_location(&ctx, user.id, "bench3").await;

    let rows = ctx
        .services
        .audit
        .list_location_audits(LocationAuditQuery {
            action: Some("DELETE".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(rows.is_empty());

    let rows = ctx
        .services
        .audit
        .list_chemical_audits(ChemicalAuditQuery {
            chemical_id: Some(12345),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn pagination_windows_the_ordered_rows() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "toluene").await;

    for i in 0..5 {
        ctx.services
            .chemicals
            .update(
                chemical.id,
                UpdateChemicalRequest {
                    description: Some(format!("revision {}", i)),
                    ..Default::default()
                },
                user.id,
            )
            .await
            .unwrap();
    }

    let full = ctx
        .services
        .audit
        .list_chemical_audits(ChemicalAuditQuery {
            chemical_id: Some(chemical.id),
            field_name: Some("description".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(full.len(), 5);

    let window = ctx
        .services
        .audit
        .list_chemical_audits(ChemicalAuditQuery {
            chemical_id: Some(chemical.id),
            field_name: Some("description".into()),
            skip: Some(1),
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].id, full[1].id);
    assert_eq!(window[1].id, full[2].id);
}

#[tokio::test]
async fn chemical_delete_is_blocked_while_referenced() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let chemical = common::seed_chemical(&ctx, user.id, "methanol").await;
    let location = common::seed_location(&ctx, user.id, "shelfB").await;

    ctx.services
        .ledger
        .create_item(
            labledger_api::services::ledger::CreateItemRequest {
                chemical_id: chemical.id,
                location_id: location.id,
                quantity: rust_decimal_macros::dec!(5),
                unit: "mL".into(),
                batch_number: "M-1".into(),
                expiration_date: None,
                supplier: None,
                acquisition_date: None,
            },
            user.id,
        )
        .await
        .unwrap();

    let blocked = ctx.services.chemicals.delete(chemical.id, user.id).await;
    assert!(matches!(blocked, Err(ServiceError::Conflict(_))));

    // Still resolvable afterwards
    assert!(ctx.services.chemicals.get(chemical.id).await.is_ok());
}

#[tokio::test]
async fn location_delete_audit_survives_the_entity() {
    let ctx = common::setup().await;
    let user = common::seed_user(&ctx).await;
    let location = ctx
        .services
        .locations
        .create(
            CreateLocationRequest {
                name: "staging".into(),
                description: Some("temporary".into()),
            },
            user.id,
        )
        .await
        .unwrap();

    ctx.services
        .locations
        .delete(location.id, user.id)
        .await
        .expect("delete location");

    assert!(matches!(
        ctx.services.locations.get(location.id).await,
        Err(ServiceError::NotFound(_))
    ));

    let trail = ctx
        .services
        .audit
        .list_location_audits(LocationAuditQuery {
            location_id: Some(location.id),
            ..Default::default()
        })
        .await
        .unwrap();
    // name + description CREATE rows plus the DELETE row
    assert_eq!(trail.len(), 3);
    assert_eq!(trail[0].action, "DELETE");
    assert_eq!(trail[0].old_value, "staging");
}
