use crate::{
    entities::user::UserRole,
    errors::{ApiError, ServiceError},
    handlers::common::{page_and_limit, validate_input},
    services::users::{CreateUser, UpdateUser, UserFilterField, UserListParams, UserResponse},
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Build the account-management Router scoped under `/api/v1`.
/// The whole surface is administrator-only (gated in the route table).
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Ana Flores",
    "email": "ana@example.com",
    "role": "employee",
    "telegram_id": "777001234",
    "phone": "+51 999 111 222",
    "password": "hunter2hunter2"
}))]
pub struct CreateUserRequest {
    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    /// Email address (must be unique)
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    /// Staff role; defaults to employee
    pub role: Option<UserRole>,

    /// Optional messaging-bot identifier
    pub telegram_id: Option<String>,

    pub phone: Option<String>,

    /// Plaintext password, hashed before storage
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,

    pub role: Option<UserRole>,
    pub telegram_id: Option<String>,
    pub phone: Option<String>,

    /// New password; re-hashed before storage
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Account listing query. The filter field doubles as the sort key, and is
/// allow-listed at deserialization.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub field: Option<UserFilterField>,
    pub value: Option<String>,
    #[serde(default)]
    pub sort_desc: bool,
}

/// List staff accounts (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<PaginatedResponse<UserResponse>>),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<UserResponse>>>, ServiceError> {
    let (page, limit) = page_and_limit(query.page, query.limit, &state.config);

    let (users, total) = state
        .services
        .users
        .list_users(UserListParams {
            page,
            limit,
            field: query.field.unwrap_or(UserFilterField::Name),
            value: query.value,
            sort_desc: query.sort_desc,
        })
        .await?;

    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        users, total, page, limit,
    ))))
}

/// Fetch a single account (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ServiceError> {
    let user = state
        .services
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User with ID {} not found", id)))?;

    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}

/// Register a staff account (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .create_user(CreateUser {
            name: payload.name,
            email: payload.email,
            role: payload.role.unwrap_or(UserRole::Employee),
            telegram_id: payload.telegram_id,
            phone: payload.phone,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserResponse::from(user))),
    ))
}

/// Update a staff account (admin only)
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .update_user(
            id,
            UpdateUser {
                name: payload.name,
                email: payload.email,
                role: payload.role,
                telegram_id: payload.telegram_id,
                phone: payload.phone,
                password: payload.password,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}
