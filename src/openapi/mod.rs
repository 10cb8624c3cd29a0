use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LabLedger API",
        version = "0.1.0",
        description = r#"
# LabLedger — Laboratory Inventory Ledger & Audit API

Backend for laboratory inventory management with an append-only quantity
ledger, field-level audit trails, and live update fan-out over WebSocket.

## Authentication

All API endpoints except registration, login, status and health require a
JWT bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Live updates

Connect to `/ws` and send `{"type": "subscribe", "resource": "inventory"}`
to receive `inventory_updated` pushes shaped `{action, resource, data}`
after every committed mutation.

## Pagination

List endpoints accept `skip` and `limit` query parameters and return rows
ordered newest first (for changes and audit logs).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Registration and token issuance"),
        (name = "inventory", description = "Inventory items, ledger entries and audit records"),
        (name = "chemicals", description = "Chemical catalog endpoints"),
        (name = "locations", description = "Storage location endpoints"),
        (name = "users", description = "Account management endpoints")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,

        // Inventory
        crate::handlers::inventory::list_items,
        crate::handlers::inventory::get_item,
        crate::handlers::inventory::create_item,
        crate::handlers::inventory::update_item,
        crate::handlers::inventory::record_change,
        crate::handlers::inventory::list_changes,
        crate::handlers::inventory::list_audit_logs,
    ),
    components(
        schemas(
            // Auth types
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::auth::TokenPair,

            // Inventory types
            crate::services::ledger::InventoryItemResponse,
            crate::services::ledger::CreateItemRequest,
            crate::services::ledger::UpdateItemRequest,
            crate::services::ledger::RecordChangeRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("LabLedger API"));
        assert!(json.contains("/api/v1/inventory/items"));
    }
}
