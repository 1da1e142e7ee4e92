use crate::{
    auth::AuthUser,
    entities::sale,
    errors::ServiceError,
    handlers::common::page_and_limit,
    services::sales::{RecordSale, SaleListParams, SaleWithProduct},
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Build the sales Router scoped under `/api/v1`.
/// Sales are append-only: there are deliberately no update/delete routes.
pub fn sale_routes() -> Router<AppState> {
    Router::new().route("/sales", get(list_sales).post(record_sale))
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "code": "V-000123",
    "product_id": "550e8400-e29b-41d4-a716-446655440000",
    "quantity": 2,
    "sale_date": "2026-08-01"
}))]
pub struct RecordSaleRequest {
    /// Human-facing sale code (receipt/ticket reference)
    pub code: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub sale_date: NaiveDate,
}

/// Sales listing query; all filters optional and combinable
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SaleListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Include sales on or after this date
    pub from: Option<NaiveDate>,
    /// Include sales on or before this date
    pub to: Option<NaiveDate>,
    /// Sale-code substring
    pub code: Option<String>,
    /// Product-name substring
    pub product: Option<String>,
}

/// List recorded sales joined with product data, newest first
#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(SaleListQuery),
    responses(
        (status = 200, description = "Sales retrieved successfully", body = ApiResponse<PaginatedResponse<SaleWithProduct>>)
    ),
    tag = "Sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<SaleWithProduct>>>, ServiceError> {
    let (page, limit) = page_and_limit(query.page, query.limit, &state.config);

    let (sales, total) = state
        .services
        .sales
        .list_sales(SaleListParams {
            from: query.from,
            to: query.to,
            code: query.code,
            product: query.product,
            page,
            limit,
        })
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        sales, total, page, limit,
    ))))
}

/// Record a sale on behalf of the authenticated staff member
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = RecordSaleRequest,
    responses(
        (status = 201, description = "Sale recorded", body = ApiResponse<sale::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "Sales"
)]
pub async fn record_sale(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RecordSaleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<sale::Model>>), ServiceError> {
    let sale = state
        .services
        .sales
        .record_sale(
            user.user_id,
            RecordSale {
                code: payload.code,
                product_id: payload.product_id,
                quantity: payload.quantity,
                sale_date: payload.sale_date,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(sale))))
}
