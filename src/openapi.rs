use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bloomshop API",
        version = "0.1.0",
        description = r#"
REST backend for the Bloomshop flower store.

Shoppers browse the catalog, fill a per-user cart, manage shipping
addresses, and check out; checkout recomputes totals server-side and
creates the order atomically. Admins manage the catalog and move order
and payment statuses.

All user-scoped endpoints require a bearer token:

```
Authorization: Bearer <your-jwt-token>
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Checkout and order history"),
        (name = "Admin", description = "Administrative endpoints")
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_orders,
        crate::handlers::orders::get_recent_orders,
        crate::handlers::admin::get_all_orders,
        crate::handlers::admin::get_order_items,
        crate::handlers::admin::update_order_status,
        crate::handlers::admin::update_payment_status,
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI router, mounted by the binary next to the API routes.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
