pub mod auth;
pub mod chemicals;
pub mod inventory;
pub mod locations;
pub mod users;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub ledger: crate::services::ledger::LedgerService,
    pub audit: crate::services::audit::AuditQueryService,
    pub chemicals: crate::services::chemicals::ChemicalsService,
    pub locations: crate::services::locations::LocationsService,
    pub users: crate::services::users::UsersService,
}

impl AppServices {
    /// Builds the service container shared by all handlers.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, auth: Arc<AuthService>) -> Self {
        Self {
            ledger: crate::services::ledger::LedgerService::new(
                db_pool.clone(),
                event_sender.clone(),
            ),
            audit: crate::services::audit::AuditQueryService::new(db_pool.clone()),
            chemicals: crate::services::chemicals::ChemicalsService::new(db_pool.clone()),
            locations: crate::services::locations::LocationsService::new(
                db_pool.clone(),
                event_sender.clone(),
            ),
            users: crate::services::users::UsersService::new(db_pool, event_sender, auth),
        }
    }
}
