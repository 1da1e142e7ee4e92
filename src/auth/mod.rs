/*!
 * # Authentication and Authorization Module
 *
 * JWT-based authentication for the StockFox API:
 *
 * - Credential verification against stored Argon2 hashes
 * - HS256 access tokens carrying the staff member's role
 * - Middleware that turns a Bearer token into a per-request [`AuthUser`]
 *   context injected into request extensions
 * - Role-based gating for administrator-only surfaces
 */

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::user::{self, Entity as User};
use crate::errors::ServiceError;

/// Role name constants used in tokens and route gating
pub mod consts {
    pub const ROLE_ADMINISTRATOR: &str = "administrator";
    pub const ROLE_EMPLOYEE: &str = "employee";
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (user ID)
    pub name: String, // User's display name
    pub email: String,
    pub role: String, // "administrator" | "employee"
    pub jti: String,  // JWT ID (unique identifier for this token)
    pub iat: i64,     // Issued at time
    pub exp: i64,     // Expiration time
    pub nbf: i64,     // Not valid before time
    pub iss: String,  // Issuer
    pub aud: String,  // Audience
}

/// Authenticated staff member extracted from a validated token.
///
/// This is the per-request context object: middleware inserts it into the
/// request extensions and handlers read it from there; services only ever
/// receive the plain fields they need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.has_role(consts::ROLE_ADMINISTRATOR)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
        }
    }
}

/// Authentication service that verifies credentials and issues/validates
/// access tokens.
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Verify credentials and issue an access token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller:
    /// both return [`ServiceError::InvalidCredentials`].
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ServiceError> {
        let user = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error during credential verification");
                ServiceError::DatabaseError(e)
            })?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(&user.password_hash, password)? {
            debug!(email = %email, "Password mismatch");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.generate_token(&user)?;

        Ok(LoginResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            user: AuthUserSummary {
                id: user.id,
                name: user.name,
                email: user.email,
                role: user.role.as_str().to_string(),
            },
        })
    }

    /// Generate a JWT access token for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| ServiceError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::JwtError(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token has expired".to_string())
            }
            _ => ServiceError::Unauthorized("Invalid authentication token".to_string()),
        })
    }
}

/// Hash a password into an Argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// Verify a password against a stored PHC string (constant-time comparison
/// inside the argon2 crate).
pub fn verify_password(hash: &str, password: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Login credentials
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: AuthUserSummary,
}

/// Minimal account summary returned on login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthUserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Role middleware to check if a user has the required role.
/// Administrators pass every role gate.
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(ServiceError::Unauthorized("Authentication required".to_string())),
    };

    if !user.is_admin() && !user.has_role(&required_role) {
        return Err(ServiceError::Forbidden(
            "Insufficient role for this resource".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates Bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();

    // Extract the auth service from the request state
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match extract_auth_from_headers(&headers, &auth_service) {
        Ok(user) => {
            // Add the authenticated user to the request extensions
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract authentication info from request headers
fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, ServiceError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("No authentication token provided".to_string()))?;

    let claims = auth_service.validate_token(token)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ServiceError::Unauthorized("Invalid authentication token".to_string()))?;

    Ok(AuthUser {
        user_id,
        name: claims.name,
        email: claims.email,
        role: claims.role,
        token_id: claims.jti,
    })
}

/// Authentication routes
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    axum::Router::new()
        .route("/login", axum::routing::post(login_handler))
        .layer(DefaultBodyLimit::max(1024 * 64)) // 64KB limit
}

/// Login handler
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let response = auth_service
        .login(&credentials.email, &credentials.password)
        .await?;

    Ok(Json(response))
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}
