use crate::{
    entities::product::{self, ProductStatus},
    errors::ServiceError,
    handlers::common::page_and_limit,
    services::products::{
        CreateProduct, ProductFilterField, ProductListParams, ProductSortField, UpdateProduct,
    },
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Build the catalog Router scoped under `/api/v1`.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/categories", get(get_categories))
        .route("/products/low-stock", get(get_low_stock))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}", put(update_product))
        .route("/products/{id}/deactivate", post(deactivate_product))
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Wireless Mouse",
    "category": "peripherals",
    "brand": "Logi",
    "stock": 40,
    "stock_min": 5,
    "price": "24.90"
}))]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub brand: String,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub stock_min: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub stock: Option<i32>,
    pub stock_min: Option<i32>,
    pub price: Option<Decimal>,
    pub status: Option<ProductStatus>,
}

/// Catalog listing query. Filter and sort fields are allow-listed enums;
/// unknown values are rejected at deserialization.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub filter_field: Option<ProductFilterField>,
    pub filter_value: Option<String>,
    pub sort_by: Option<ProductSortField>,
    #[serde(default)]
    pub sort_desc: bool,
    #[serde(default)]
    pub include_inactive: bool,
}

/// List catalog products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products retrieved successfully", body = ApiResponse<PaginatedResponse<product::Model>>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<product::Model>>>, ServiceError> {
    let (page, limit) = page_and_limit(query.page, query.limit, &state.config);

    let (products, total) = state
        .services
        .products
        .list_products(ProductListParams {
            page,
            limit,
            filter_field: query.filter_field,
            filter_value: query.filter_value,
            sort_by: query.sort_by.unwrap_or(ProductSortField::Name),
            sort_desc: query.sort_desc,
            include_inactive: query.include_inactive,
        })
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        products, total, page, limit,
    ))))
}

/// Fetch a single product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved successfully", body = ApiResponse<product::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state
        .services
        .products
        .get_product(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product with ID {} not found", id)))?;

    Ok(Json(ApiResponse::success(product)))
}

/// Register a new product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<product::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), ServiceError> {
    let product = state
        .services
        .products
        .create_product(CreateProduct {
            name: payload.name,
            category: payload.category,
            brand: payload.brand,
            stock: payload.stock,
            stock_min: payload.stock_min,
            price: payload.price,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

/// Update an existing product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<product::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state
        .services
        .products
        .update_product(
            id,
            UpdateProduct {
                name: payload.name,
                category: payload.category,
                brand: payload.brand,
                stock: payload.stock,
                stock_min: payload.stock_min,
                price: payload.price,
                status: payload.status,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(product)))
}

/// Soft-delete a product (flips status to inactive)
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deactivated", body = ApiResponse<product::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn deactivate_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state.services.products.deactivate_product(id).await?;

    Ok(Json(ApiResponse::success(product)))
}

/// Distinct product categories, the enumeration forecasts are scoped by
#[utoipa::path(
    get,
    path = "/api/v1/products/categories",
    responses(
        (status = 200, description = "Categories retrieved successfully", body = ApiResponse<Vec<String>>)
    ),
    tag = "Products"
)]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, ServiceError> {
    let categories = state.services.products.categories().await?;

    Ok(Json(ApiResponse::success(categories)))
}

/// Active products at or below their minimum stock threshold
#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    responses(
        (status = 200, description = "Low-stock products retrieved successfully", body = ApiResponse<Vec<product::Model>>)
    ),
    tag = "Products"
)]
pub async fn get_low_stock(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<product::Model>>>, ServiceError> {
    let products = state.services.products.low_stock().await?;

    Ok(Json(ApiResponse::success(products)))
}
