use crate::{
    entities::prediction,
    errors::ServiceError,
    handlers::common::page_and_limit,
    services::forecasting::{ForecastRow, MonthlySalesPoint},
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Build the forecast Router scoped under `/api/v1/forecasts`.
///
/// The route split mirrors the two explicit steps of the pipeline: generate
/// returns proposed rows without writing; save persists a caller-approved
/// set. Nothing is cached between the two calls.
pub fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_predictions).post(save_forecast))
        .route("/monthly-sales", get(get_monthly_sales))
        .route("/generate", post(generate_forecast))
}

/// Category selector for aggregation/generation
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryQuery {
    /// One of the distinct category values from /products/categories
    pub category: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({ "category": "peripherals" }))]
pub struct GenerateForecastRequest {
    /// One of the distinct category values from /products/categories
    pub category: String,
}

/// Caller-approved forecast rows to persist
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveForecastRequest {
    pub rows: Vec<ForecastRow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveForecastResponse {
    /// Number of rows inserted
    pub saved: usize,
}

/// Stored-prediction listing query
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PredictionListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub product_id: Option<Uuid>,
}

/// Monthly sales totals per product for a category.
///
/// Recomputed from raw sales on every call; months with no sales are absent
/// rather than zero. An empty list means the category cannot be forecast.
#[utoipa::path(
    get,
    path = "/api/v1/forecasts/monthly-sales",
    params(CategoryQuery),
    responses(
        (status = 200, description = "Monthly totals retrieved successfully", body = ApiResponse<Vec<MonthlySalesPoint>>)
    ),
    tag = "Forecasts"
)]
pub async fn get_monthly_sales(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ApiResponse<Vec<MonthlySalesPoint>>>, ServiceError> {
    let points = state
        .services
        .forecasting
        .monthly_sales(&query.category)
        .await?;

    Ok(Json(ApiResponse::success(points)))
}

/// Run the aggregate-and-fit pipeline for a category.
///
/// Returns three projected months per qualifying product without writing
/// anything. Responds 422 when the category has no sales or no product has
/// two observed months.
#[utoipa::path(
    post,
    path = "/api/v1/forecasts/generate",
    request_body = GenerateForecastRequest,
    responses(
        (status = 200, description = "Forecast generated", body = ApiResponse<Vec<ForecastRow>>),
        (status = 422, description = "Not enough historical data", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecasts"
)]
pub async fn generate_forecast(
    State(state): State<AppState>,
    Json(payload): Json<GenerateForecastRequest>,
) -> Result<Json<ApiResponse<Vec<ForecastRow>>>, ServiceError> {
    let rows = state.services.forecasting.generate(&payload.category).await?;

    Ok(Json(ApiResponse::success(rows)))
}

/// Persist a caller-approved forecast set.
///
/// Append-only: saving the same rows again inserts duplicates by design,
/// preserving earlier runs as history.
#[utoipa::path(
    post,
    path = "/api/v1/forecasts",
    request_body = SaveForecastRequest,
    responses(
        (status = 201, description = "Forecast rows saved", body = ApiResponse<SaveForecastResponse>),
        (status = 400, description = "Empty forecast set", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecasts"
)]
pub async fn save_forecast(
    State(state): State<AppState>,
    Json(payload): Json<SaveForecastRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SaveForecastResponse>>), ServiceError> {
    let saved = state.services.forecasting.save(payload.rows).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SaveForecastResponse { saved })),
    ))
}

/// Page through stored predictions, latest generation first
#[utoipa::path(
    get,
    path = "/api/v1/forecasts",
    params(PredictionListQuery),
    responses(
        (status = 200, description = "Predictions retrieved successfully", body = ApiResponse<PaginatedResponse<prediction::Model>>)
    ),
    tag = "Forecasts"
)]
pub async fn list_predictions(
    State(state): State<AppState>,
    Query(query): Query<PredictionListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<prediction::Model>>>, ServiceError> {
    let (page, limit) = page_and_limit(query.page, query.limit, &state.config);

    let (predictions, total) = state
        .services
        .forecasting
        .list_predictions(query.product_id, page, limit)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        predictions,
        total,
        page,
        limit,
    ))))
}
