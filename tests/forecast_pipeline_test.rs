//! End-to-end tests for the demand-forecast pipeline:
//! aggregation → generation → persistence, driven through the HTTP surface.

mod common;

use axum::http::Method;
use common::{date, response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn monthly_sales_sums_quantities_per_product_month() {
    let app = TestApp::new().await;
    let product = app.seed_product("HDMI Cable", "cables", "9.90").await;

    // Two sales inside January must collapse into one 10-unit point.
    app.seed_sale(product, 4, date(2026, 1, 5)).await;
    app.seed_sale(product, 6, date(2026, 1, 22)).await;
    app.seed_sale(product, 12, date(2026, 2, 3)).await;

    let response = app
        .request_employee(
            Method::GET,
            "/api/v1/forecasts/monthly-sales?category=cables",
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let points = body["data"].as_array().expect("points array");
    assert_eq!(points.len(), 2);

    assert_eq!(points[0]["month"], "2026-01-01");
    assert_eq!(points[0]["total_quantity"], 10);
    assert_eq!(points[1]["month"], "2026-02-01");
    assert_eq!(points[1]["total_quantity"], 12);
}

#[tokio::test]
async fn aggregation_is_idempotent_on_unchanged_data() {
    let app = TestApp::new().await;
    let product = app.seed_product("USB Hub", "cables", "19.00").await;
    app.seed_sale(product, 3, date(2026, 1, 10)).await;
    app.seed_sale(product, 5, date(2026, 2, 10)).await;

    let first = response_json(
        app.request_employee(
            Method::GET,
            "/api/v1/forecasts/monthly-sales?category=cables",
            None,
        )
        .await,
    )
    .await;
    let second = response_json(
        app.request_employee(
            Method::GET,
            "/api/v1/forecasts/monthly-sales?category=cables",
            None,
        )
        .await,
    )
    .await;

    assert_eq!(first["data"], second["data"]);
}

#[tokio::test]
async fn generate_emits_three_future_months_per_qualifying_product() {
    let app = TestApp::new().await;
    let product = app.seed_product("Monitor 24", "monitors", "199.00").await;
    app.seed_sale(product, 10, date(2026, 1, 15)).await;
    app.seed_sale(product, 12, date(2026, 2, 15)).await;
    app.seed_sale(product, 11, date(2026, 3, 15)).await;

    let response = app
        .request_employee(
            Method::POST,
            "/api/v1/forecasts/generate",
            Some(json!({ "category": "monitors" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let rows = body["data"].as_array().expect("forecast rows");
    assert_eq!(rows.len(), 3);

    let months: Vec<&str> = rows
        .iter()
        .map(|r| r["forecast_date"].as_str().expect("date"))
        .collect();
    assert_eq!(months, vec!["2026-04-01", "2026-05-01", "2026-06-01"]);

    for row in rows {
        assert_eq!(row["product_id"].as_str(), Some(product.to_string().as_str()));
        let demand = row["estimated_demand"].as_i64().expect("integer demand");
        assert!(demand >= 0);
        // Fitted on totals between 10 and 12; the ensemble mean cannot
        // leave that range.
        assert!((10..=12).contains(&demand));
    }
}

#[tokio::test]
async fn calendar_gaps_compress_the_index_but_not_the_projection() {
    let app = TestApp::new().await;
    let product = app.seed_product("Webcam", "video", "49.00").await;

    // January and April only: indices 1 and 2, projection from April.
    app.seed_sale(product, 8, date(2026, 1, 9)).await;
    app.seed_sale(product, 9, date(2026, 4, 12)).await;

    let response = app
        .request_employee(
            Method::POST,
            "/api/v1/forecasts/generate",
            Some(json!({ "category": "video" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let months: Vec<&str> = body["data"]
        .as_array()
        .expect("rows")
        .iter()
        .map(|r| r["forecast_date"].as_str().expect("date"))
        .collect();
    assert_eq!(months, vec!["2026-05-01", "2026-06-01", "2026-07-01"]);
}

#[tokio::test]
async fn products_with_single_observed_month_are_omitted() {
    let app = TestApp::new().await;
    let qualified = app.seed_product("Keyboard", "peripherals", "35.00").await;
    let lonely = app.seed_product("Mousepad", "peripherals", "8.00").await;

    app.seed_sale(qualified, 5, date(2026, 1, 3)).await;
    app.seed_sale(qualified, 7, date(2026, 2, 3)).await;
    app.seed_sale(lonely, 2, date(2026, 2, 14)).await;

    let response = app
        .request_employee(
            Method::POST,
            "/api/v1/forecasts/generate",
            Some(json!({ "category": "peripherals" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let rows = body["data"].as_array().expect("rows");
    assert_eq!(rows.len(), 3);
    assert!(rows
        .iter()
        .all(|r| r["product_id"].as_str() == Some(qualified.to_string().as_str())));
}

#[tokio::test]
async fn category_without_sales_is_unprocessable() {
    let app = TestApp::new().await;
    app.seed_product("Dormant Item", "dormant", "5.00").await;

    // Aggregation view: empty, not an error.
    let aggregate = app
        .request_employee(
            Method::GET,
            "/api/v1/forecasts/monthly-sales?category=dormant",
            None,
        )
        .await;
    assert_eq!(aggregate.status(), 200);
    let body = response_json(aggregate).await;
    assert_eq!(body["data"].as_array().expect("array").len(), 0);

    // Generation: explicit not-enough-data condition.
    let response = app
        .request_employee(
            Method::POST,
            "/api/v1/forecasts/generate",
            Some(json!({ "category": "dormant" })),
        )
        .await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn category_with_only_short_series_is_unprocessable() {
    let app = TestApp::new().await;
    let product = app.seed_product("One-hit Wonder", "fads", "3.00").await;
    app.seed_sale(product, 50, date(2026, 6, 1)).await;

    let response = app
        .request_employee(
            Method::POST,
            "/api/v1/forecasts/generate",
            Some(json!({ "category": "fads" })),
        )
        .await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn saving_the_same_forecast_twice_doubles_the_rows() {
    let app = TestApp::new().await;
    let product = app.seed_product("Router", "network", "89.00").await;
    app.seed_sale(product, 6, date(2026, 1, 2)).await;
    app.seed_sale(product, 8, date(2026, 2, 2)).await;

    let generated = response_json(
        app.request_employee(
            Method::POST,
            "/api/v1/forecasts/generate",
            Some(json!({ "category": "network" })),
        )
        .await,
    )
    .await;
    let rows = generated["data"].clone();

    // First save.
    let first = app
        .request_employee(
            Method::POST,
            "/api/v1/forecasts",
            Some(json!({ "rows": rows.clone() })),
        )
        .await;
    assert_eq!(first.status(), 201);
    let first_body = response_json(first).await;
    assert_eq!(first_body["data"]["saved"], 3);

    // Second save of the identical set: append-only, no dedup.
    let second = app
        .request_employee(
            Method::POST,
            "/api/v1/forecasts",
            Some(json!({ "rows": rows })),
        )
        .await;
    assert_eq!(second.status(), 201);

    let listed = response_json(
        app.request_employee(
            Method::GET,
            &format!("/api/v1/forecasts?product_id={product}"),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(listed["data"]["total"], 6);
}

#[tokio::test]
async fn saving_an_empty_forecast_set_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_employee(
            Method::POST,
            "/api/v1/forecasts",
            Some(json!({ "rows": [] })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn forecast_surface_requires_authentication() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/forecasts/generate",
            Some(json!({ "category": "anything" })),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);
}
