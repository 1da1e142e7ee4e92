use crate::{
    auth::hash_password,
    db::DbPool,
    entities::user::{self, Column as UserColumn, Entity as User, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Filterable (and sortable) account fields. Deserialization enforces the
/// allow-list; free-text field names never reach the query builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserFilterField {
    Name,
    Email,
    Role,
    Phone,
}

impl UserFilterField {
    fn column(self) -> UserColumn {
        match self {
            UserFilterField::Name => UserColumn::Name,
            UserFilterField::Email => UserColumn::Email,
            UserFilterField::Role => UserColumn::Role,
            UserFilterField::Phone => UserColumn::Phone,
        }
    }
}

/// New staff account
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub telegram_id: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

/// Account update; None fields are left untouched. A provided password is
/// re-hashed before storage.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub telegram_id: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// Account listing parameters. Results are sorted on the filter field, the
/// way the management screen drives it.
#[derive(Debug, Clone)]
pub struct UserListParams {
    pub page: u64,
    pub limit: u64,
    pub field: UserFilterField,
    pub value: Option<String>,
    pub sort_desc: bool,
}

/// Account data safe to serialize; the password hash never leaves the
/// service layer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub telegram_id: Option<String>,
    pub phone: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            telegram_id: model.telegram_id,
            phone: model.phone,
            registered_at: model.registered_at,
        }
    }
}

/// Service for administering staff accounts
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl UserService {
    /// Creates a new user service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Create a staff account, hashing the password before storage
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: CreateUser) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;

        if input.name.trim().is_empty() || input.email.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Name and email are required".to_string(),
            ));
        }
        if input.password.len() < 8 {
            return Err(ServiceError::ValidationError(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let existing = User::find()
            .filter(UserColumn::Email.eq(&input.email))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error when checking for existing email");
                ServiceError::DatabaseError(e)
            })?;

        if existing.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "A user with email '{}' already exists",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password)?;

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            role: Set(input.role),
            telegram_id: Set(input.telegram_id),
            phone: Set(input.phone),
            password_hash: Set(password_hash),
            registered_at: Set(Utc::now()),
        };

        let result = user.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create user");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender.send(Event::UserCreated(result.id)).await;

        info!(user_id = %result.id, "User created successfully");

        Ok(result)
    }

    /// Get a user by ID
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> Result<Option<user::Model>, ServiceError> {
        let db = &*self.db_pool;

        User::find_by_id(id).one(db).await.map_err(|e| {
            error!(user_id = %id, error = %e, "Database error when fetching user");
            ServiceError::DatabaseError(e)
        })
    }

    /// List accounts with allow-listed filtering, sorted on the filter field
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        params: UserListParams,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = User::find();

        if let Some(value) = params.value.as_deref() {
            if !value.trim().is_empty() {
                let pattern = format!("%{}%", value.to_lowercase());
                query = query.filter(
                    Expr::expr(Func::lower(Expr::col(params.field.column()))).like(pattern),
                );
            }
        }

        let column = params.field.column();
        query = if params.sort_desc {
            query.order_by_desc(column)
        } else {
            query.order_by_asc(column)
        };

        let paginator = query.paginate(db, params.limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Database error when counting users");
            ServiceError::DatabaseError(e)
        })?;

        let users = paginator
            .fetch_page(params.page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(page = params.page, error = %e, "Database error when fetching users");
                ServiceError::DatabaseError(e)
            })?;

        Ok((users, total))
    }

    /// Update an account; a provided password is re-hashed
    #[instrument(skip(self, input))]
    pub async fn update_user(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;

        let user = User::find_by_id(id)
            .one(db)
            .await
            .map_err(|e| {
                error!(user_id = %id, error = %e, "Database error when finding user");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("User with ID {} not found", id)))?;

        if let Some(email) = input.email.as_deref() {
            let taken = User::find()
                .filter(UserColumn::Email.eq(email))
                .filter(UserColumn::Id.ne(id))
                .one(db)
                .await
                .map_err(|e| {
                    error!(error = %e, "Database error when checking for existing email");
                    ServiceError::DatabaseError(e)
                })?;
            if taken.is_some() {
                return Err(ServiceError::ValidationError(format!(
                    "A user with email '{}' already exists",
                    email
                )));
            }
        }

        let mut user: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            user.name = Set(name);
        }
        if let Some(email) = input.email {
            user.email = Set(email);
        }
        if let Some(role) = input.role {
            user.role = Set(role);
        }
        if let Some(telegram_id) = input.telegram_id {
            user.telegram_id = Set(Some(telegram_id));
        }
        if let Some(phone) = input.phone {
            user.phone = Set(Some(phone));
        }
        if let Some(password) = input.password {
            if password.len() < 8 {
                return Err(ServiceError::ValidationError(
                    "Password must be at least 8 characters".to_string(),
                ));
            }
            user.password_hash = Set(hash_password(&password)?);
        }

        let updated = user.update(db).await.map_err(|e| {
            error!(user_id = %id, error = %e, "Database error when updating user");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender.send(Event::UserUpdated(updated.id)).await;

        info!(user_id = %updated.id, "User updated successfully");

        Ok(updated)
    }
}
