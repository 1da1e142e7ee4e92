use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StockFox API",
        version = "0.3.0",
        description = r#"
# StockFox Inventory & Sales API

Backend for the StockFox dashboard: product catalog, sales entry, staff
accounts, and per-category demand forecasting.

## Authentication

Obtain a token via `POST /auth/login` and pass it on every request:

```
Authorization: Bearer <your-jwt-token>
```

Account management endpoints additionally require the `administrator` role.

## Forecast pipeline

1. `GET /api/v1/products/categories` - enumerate categories
2. `GET /api/v1/forecasts/monthly-sales?category=...` - inspect history
3. `POST /api/v1/forecasts/generate` - fit and project three months
4. `POST /api/v1/forecasts` - persist the approved rows (append-only)

## Pagination

List endpoints accept `page` (1-based) and `limit` query parameters; the
limit is clamped to the configured maximum.
"#,
        contact(name = "StockFox", email = "support@stockfox.dev")
    ),
    paths(
        crate::auth::login_handler,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::deactivate_product,
        crate::handlers::products::get_categories,
        crate::handlers::products::get_low_stock,
        crate::handlers::sales::list_sales,
        crate::handlers::sales::record_sale,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::forecasts::get_monthly_sales,
        crate::handlers::forecasts::generate_forecast,
        crate::handlers::forecasts::save_forecast,
        crate::handlers::forecasts::list_predictions,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::auth::LoginRequest,
        crate::auth::LoginResponse,
        crate::auth::AuthUserSummary,
        crate::entities::product::Model,
        crate::entities::product::ProductStatus,
        crate::entities::sale::Model,
        crate::entities::prediction::Model,
        crate::entities::user::UserRole,
        crate::services::users::UserResponse,
        crate::services::sales::SaleWithProduct,
        crate::services::forecasting::MonthlySalesPoint,
        crate::services::forecasting::ForecastRow,
    )),
    tags(
        (name = "Auth", description = "Login and token issuance"),
        (name = "Products", description = "Catalog management"),
        (name = "Sales", description = "Sales entry and queries"),
        (name = "Users", description = "Staff account administration"),
        (name = "Forecasts", description = "Demand-forecast pipeline")
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
