use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use stockfox_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::user::UserRole,
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        products::CreateProduct,
        sales::RecordSale,
        users::CreateUser,
    },
    AppState,
};
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "root@stockfox.test";
pub const ADMIN_PASSWORD: &str = "rootpassword1";
pub const EMPLOYEE_EMAIL: &str = "ana@stockfox.test";
pub const EMPLOYEE_PASSWORD: &str = "anapassword1";

const TEST_JWT_SECRET: &str =
    "integration_test_secret_key_with_plenty_of_unique_characters_0987654321";

/// Helper harness spinning up the full router over a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin_token: String,
    pub employee_token: String,
    pub admin_id: Uuid,
    pub employee_id: Uuid,
    _db_file: NamedTempFile,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = NamedTempFile::new().expect("temp db file");
        let database_url = format!("sqlite://{}?mode=rwc", db_file.path().display());

        let cfg = AppConfig::new(
            database_url,
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "development".to_string(),
        );

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("database connection");
        db::run_migrations(&pool).await.expect("migrations");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        tokio::spawn(events::process_events(event_rx));

        let auth_cfg = AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        );
        let auth_service = Arc::new(AuthService::new(auth_cfg, db_arc.clone()));

        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg);

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        // Seed one administrator and one employee.
        let admin = state
            .services
            .users
            .create_user(CreateUser {
                name: "Root".to_string(),
                email: ADMIN_EMAIL.to_string(),
                role: UserRole::Administrator,
                telegram_id: None,
                phone: None,
                password: ADMIN_PASSWORD.to_string(),
            })
            .await
            .expect("seed admin");

        let employee = state
            .services
            .users
            .create_user(CreateUser {
                name: "Ana".to_string(),
                email: EMPLOYEE_EMAIL.to_string(),
                role: UserRole::Employee,
                telegram_id: None,
                phone: None,
                password: EMPLOYEE_PASSWORD.to_string(),
            })
            .await
            .expect("seed employee");

        let admin_token = auth_service.generate_token(&admin).expect("admin token");
        let employee_token = auth_service
            .generate_token(&employee)
            .expect("employee token");

        let router = Router::new()
            .nest("/api/v1", stockfox_api::api_v1_routes())
            .nest(
                "/auth",
                stockfox_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(axum::middleware::from_fn_with_state(
                auth_service,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: axum::http::Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            admin_token,
            employee_token,
            admin_id: admin.id,
            employee_id: employee.id,
            _db_file: db_file,
        }
    }

    /// Fire a request with an optional JSON body and optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(path);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router.clone().oneshot(request).await.expect("response")
    }

    /// Request authenticated as the seeded administrator.
    pub async fn request_admin(&self, method: Method, path: &str, body: Option<Value>) -> Response {
        let token = self.admin_token.clone();
        self.request(method, path, body, Some(&token)).await
    }

    /// Request authenticated as the seeded employee.
    pub async fn request_employee(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.employee_token.clone();
        self.request(method, path, body, Some(&token)).await
    }

    /// Seed a catalog product directly through the service layer.
    pub async fn seed_product(&self, name: &str, category: &str, price: &str) -> Uuid {
        self.state
            .services
            .products
            .create_product(CreateProduct {
                name: name.to_string(),
                category: category.to_string(),
                brand: "TestBrand".to_string(),
                stock: 100,
                stock_min: 5,
                price: price.parse::<Decimal>().expect("decimal price"),
            })
            .await
            .expect("seed product")
            .id
    }

    /// Seed a sale on a given date directly through the service layer.
    pub async fn seed_sale(&self, product_id: Uuid, quantity: i32, date: NaiveDate) {
        self.state
            .services
            .sales
            .record_sale(
                self.employee_id,
                RecordSale {
                    code: format!("V-{}", Uuid::new_v4().simple()),
                    product_id,
                    quantity,
                    sale_date: date,
                },
            )
            .await
            .expect("seed sale");
    }
}

/// Decode a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Convenience date constructor for test fixtures.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}
