#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use labledger_api::{
    auth::{AuthConfig, AuthService},
    db::{self, DbConfig, DbPool},
    entities::{chemical, experiment, location, user},
    events::{process_events, EventSender},
    handlers::AppServices,
    ws::SubscriptionHub,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;

pub struct TestContext {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
    pub hub: Arc<SubscriptionHub>,
}

/// Builds an isolated in-memory database with the full schema plus the
/// service stack wired to a live fan-out task.
///
/// The pool is capped at a single connection so the SQLite memory database
/// is shared by every query in the test.
pub async fn setup() -> TestContext {
    let cfg = DbConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&cfg)
        .await
        .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");
    let db = Arc::new(pool);

    let hub = Arc::new(SubscriptionHub::new());
    let (tx, rx) = mpsc::channel(256);
    let event_sender = EventSender::new(tx);
    tokio::spawn(process_events(rx, hub.clone()));

    let auth = Arc::new(AuthService::new(
        AuthConfig::new(
            "integration-test-secret-key-0123456789".into(),
            Duration::from_secs(3600),
        ),
        db.clone(),
    ));
    let services = AppServices::new(db.clone(), event_sender, auth.clone());

    TestContext {
        db,
        services,
        auth,
        hub,
    }
}

pub async fn seed_user(ctx: &TestContext) -> user::Model {
    ctx.auth
        .register("analyst@lab.test", "Lab Analyst", "password123")
        .await
        .expect("register user")
}

pub async fn seed_chemical(ctx: &TestContext, actor_id: i32, name: &str) -> chemical::Model {
    ctx.services
        .chemicals
        .create(
            labledger_api::services::chemicals::CreateChemicalRequest {
                name: name.to_string(),
                cas_number: Some(format!("cas-{}", name)),
                formula: None,
                molecular_weight: None,
                description: None,
                hazard_information: None,
                storage_conditions: None,
            },
            actor_id,
        )
        .await
        .expect("create chemical")
}

pub async fn seed_location(ctx: &TestContext, actor_id: i32, name: &str) -> location::Model {
    ctx.services
        .locations
        .create(
            labledger_api::services::locations::CreateLocationRequest {
                name: name.to_string(),
                description: None,
            },
            actor_id,
        )
        .await
        .expect("create location")
}

pub async fn seed_experiment(ctx: &TestContext, user_id: i32, title: &str) -> experiment::Model {
    experiment::ActiveModel {
        title: Set(title.to_string()),
        description: Set(None),
        status: Set("in-progress".to_string()),
        user_id: Set(user_id),
        start_date: Set(Some(Utc::now())),
        end_date: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(&*ctx.db)
    .await
    .expect("create experiment")
}
