//! Demand-forecast pipeline: aggregate monthly sales per product for a
//! category, fit a tree ensemble per product on a synthetic month index, and
//! project a fixed three-month horizon.
//!
//! The pipeline is strictly request-synchronous. Generation never writes;
//! persistence is a separate, caller-approved step. Nothing is cached
//! between the two, so regenerating always re-aggregates and re-fits from
//! scratch.

use crate::{
    db::DbPool,
    entities::{
        prediction::{self, Column as PredictionColumn, Entity as Prediction},
        product,
        sale::{self, Entity as Sale},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ml::{ForestConfig, RandomForestRegressor},
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Fixed projection horizon: three future months per qualifying product.
const FORECAST_HORIZON_MONTHS: u32 = 3;

/// Minimum observed months before a product qualifies for a fit.
const MIN_OBSERVED_MONTHS: usize = 2;

/// One aggregated month of sales for a product. Derived, never persisted;
/// recomputed from raw sales on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthlySalesPoint {
    pub product_id: Uuid,
    /// First-of-month truncation of the sale dates it covers
    pub month: NaiveDate,
    pub total_quantity: i64,
}

/// One proposed forecast row, as returned by generation and accepted back
/// by the save step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ForecastRow {
    pub product_id: Uuid,
    /// Target future month (first-of-month date)
    pub forecast_date: NaiveDate,
    /// Truncated (not rounded) model output
    pub estimated_demand: i32,
}

/// Service that runs the aggregate → fit → persist pipeline.
///
/// Known, deliberate model weaknesses: no seasonality awareness, no
/// confidence bounds, and short series (the two-point minimum) fit
/// essentially noise.
pub struct ForecastingService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    forest: ForestConfig,
    rng_seed: Option<u64>,
}

impl ForecastingService {
    /// Creates a new forecasting service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, n_trees: usize) -> Self {
        Self {
            db_pool,
            event_sender,
            forest: ForestConfig {
                n_trees,
                ..ForestConfig::default()
            },
            rng_seed: None,
        }
    }

    /// Pin the bootstrap RNG for reproducible output (used by tests)
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Aggregate sales of the given category into per-product monthly
    /// totals, ordered by (product, month).
    ///
    /// Months without sales are absent, not zero: a product sold in January
    /// and April yields two points, and the forecast's synthetic index will
    /// treat them as consecutive. An empty result means "cannot forecast",
    /// not an error.
    #[instrument(skip(self))]
    pub async fn monthly_sales(&self, category: &str) -> Result<Vec<MonthlySalesPoint>, ServiceError> {
        let db = &*self.db_pool;

        let sales: Vec<sale::Model> = Sale::find()
            .join(JoinType::InnerJoin, sale::Relation::Product.def())
            .filter(product::Column::Category.eq(category))
            .all(db)
            .await
            .map_err(|e| {
                error!(category = %category, error = %e, "Database error when aggregating sales");
                ServiceError::DatabaseError(e)
            })?;

        // Group in a BTreeMap so repeated runs over unchanged data produce
        // identical output ordering.
        let mut grouped: BTreeMap<(Uuid, NaiveDate), i64> = BTreeMap::new();
        for sale in sales {
            let month = month_floor(sale.sale_date);
            *grouped.entry((sale.product_id, month)).or_insert(0) += i64::from(sale.quantity);
        }

        Ok(grouped
            .into_iter()
            .map(|((product_id, month), total_quantity)| MonthlySalesPoint {
                product_id,
                month,
                total_quantity,
            })
            .collect())
    }

    /// Run aggregation and fit for a category, returning three projected
    /// rows per qualifying product. Does not write anything.
    ///
    /// Products with fewer than two observed months are skipped silently;
    /// if the category has no sales at all, or no product qualifies, an
    /// InsufficientHistory error is surfaced so the caller can tell the
    /// user rather than render an empty table.
    #[instrument(skip(self))]
    pub async fn generate(&self, category: &str) -> Result<Vec<ForecastRow>, ServiceError> {
        let points = self.monthly_sales(category).await?;

        if points.is_empty() {
            return Err(ServiceError::InsufficientHistory(format!(
                "no sales recorded for category '{}'",
                category
            )));
        }

        let rows = self.fit_and_project(&points)?;

        if rows.is_empty() {
            return Err(ServiceError::InsufficientHistory(format!(
                "no product in category '{}' has at least {} months of sales",
                category, MIN_OBSERVED_MONTHS
            )));
        }

        self.event_sender
            .send(Event::ForecastGenerated {
                category: category.to_string(),
                products: rows.len() / FORECAST_HORIZON_MONTHS as usize,
            })
            .await;

        info!(
            category = %category,
            rows = rows.len(),
            "Forecast generated"
        );

        Ok(rows)
    }

    /// Fit one ensemble per product on the synthetic index 1..N over its
    /// *observed* months and predict the next three indices, mapped onto
    /// the three calendar months after the last observed month.
    fn fit_and_project(&self, points: &[MonthlySalesPoint]) -> Result<Vec<ForecastRow>, ServiceError> {
        // monthly_sales emits points ordered by (product, month), so a
        // BTreeMap of Vecs keeps each series month-ascending.
        let mut by_product: BTreeMap<Uuid, Vec<&MonthlySalesPoint>> = BTreeMap::new();
        for point in points {
            by_product.entry(point.product_id).or_default().push(point);
        }

        let mut rows = Vec::new();

        for (product_id, series) in by_product {
            if series.len() < MIN_OBSERVED_MONTHS {
                continue;
            }

            // Synthetic index counts observed months only; calendar gaps
            // compress away here and are reintroduced below when mapping
            // predictions back onto real months.
            let xs: Vec<f64> = (1..=series.len()).map(|i| i as f64).collect();
            let ys: Vec<f64> = series.iter().map(|p| p.total_quantity as f64).collect();

            let mut rng = self.rng();
            let forest = RandomForestRegressor::fit(&self.forest, &xs, &ys, &mut rng);

            let last_index = series.len() as f64;
            let last_month = match series.last() {
                Some(point) => point.month,
                None => continue,
            };

            for step in 1..=FORECAST_HORIZON_MONTHS {
                let predicted = forest.predict(last_index + f64::from(step));
                let forecast_date = last_month
                    .checked_add_months(Months::new(step))
                    .ok_or_else(|| {
                        ServiceError::InternalError("Forecast date out of range".to_string())
                    })?;

                rows.push(ForecastRow {
                    product_id,
                    forecast_date,
                    // Truncation toward zero, matching the original's
                    // integer cast, not rounding.
                    estimated_demand: predicted.trunc() as i32,
                });
            }
        }

        Ok(rows)
    }

    /// Persist a caller-approved forecast set in a single transaction.
    ///
    /// Append-only by policy: there is no uniqueness constraint and no
    /// dedup, so saving the same set twice doubles the stored rows. The
    /// batch either commits entirely or not at all.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn save(&self, rows: Vec<ForecastRow>) -> Result<usize, ServiceError> {
        if rows.is_empty() {
            return Err(ServiceError::ValidationError(
                "No forecast rows to save".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let count = rows.len();
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to open transaction for forecast save");
            ServiceError::DatabaseError(e)
        })?;

        for row in rows {
            let model = prediction::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(row.product_id),
                forecast_date: Set(row.forecast_date),
                estimated_demand: Set(row.estimated_demand),
                created_at: Set(now),
            };
            model.insert(&txn).await.map_err(|e| {
                error!(error = %e, "Failed to insert forecast row");
                ServiceError::DatabaseError(e)
            })?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit forecast save");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender.send(Event::ForecastSaved { rows: count }).await;

        info!(rows = count, "Forecast rows saved");

        Ok(count)
    }

    /// Page through stored predictions, latest run first
    #[instrument(skip(self))]
    pub async fn list_predictions(
        &self,
        product_id: Option<Uuid>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<prediction::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Prediction::find();

        if let Some(product_id) = product_id {
            query = query.filter(PredictionColumn::ProductId.eq(product_id));
        }

        query = query
            .order_by_desc(PredictionColumn::CreatedAt)
            .order_by_asc(PredictionColumn::ForecastDate);

        let paginator = query.paginate(db, limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Database error when counting predictions");
            ServiceError::DatabaseError(e)
        })?;

        let predictions = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(page, error = %e, "Database error when fetching predictions");
                ServiceError::DatabaseError(e)
            })?;

        Ok((predictions, total))
    }
}

/// First day of the month containing `date`
fn month_floor(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn sender() -> EventSender {
        let (tx, _rx) = mpsc::channel(16);
        EventSender::new(tx)
    }

    async fn service_with_seed(seed: u64) -> ForecastingService {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        ForecastingService::new(Arc::new(db), sender(), 50).with_rng_seed(seed)
    }

    fn point(product_id: Uuid, year: i32, month: u32, qty: i64) -> MonthlySalesPoint {
        MonthlySalesPoint {
            product_id,
            month: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
            total_quantity: qty,
        }
    }

    #[test]
    fn month_floor_truncates_to_first_of_month() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 17).unwrap();
        assert_eq!(month_floor(d), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[tokio::test]
    async fn three_rows_per_qualifying_product_dated_after_last_month() {
        let svc = service_with_seed(1).await;
        let product = Uuid::new_v4();
        let points = vec![
            point(product, 2026, 1, 10),
            point(product, 2026, 2, 12),
            point(product, 2026, 3, 11),
        ];

        let rows = svc.fit_and_project(&points).unwrap();

        assert_eq!(rows.len(), 3);
        let expected_months = [
            NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        ];
        for (row, expected) in rows.iter().zip(expected_months) {
            assert_eq!(row.product_id, product);
            assert_eq!(row.forecast_date, expected);
            assert!(row.estimated_demand >= 0);
            assert!(row.forecast_date > points.last().unwrap().month);
        }
    }

    #[tokio::test]
    async fn single_month_products_are_skipped() {
        let svc = service_with_seed(2).await;
        let lonely = Uuid::new_v4();
        let qualified = Uuid::new_v4();
        let points = vec![
            point(lonely, 2026, 1, 5),
            point(qualified, 2026, 1, 4),
            point(qualified, 2026, 2, 6),
        ];

        let rows = svc.fit_and_project(&points).unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.product_id == qualified));
    }

    #[tokio::test]
    async fn calendar_gaps_project_from_last_observed_month() {
        // Sales in January and April only: synthetic indices 1 and 2, but
        // the projection starts after April, not after "month 2".
        let svc = service_with_seed(3).await;
        let product = Uuid::new_v4();
        let points = vec![point(product, 2026, 1, 8), point(product, 2026, 4, 9)];

        let rows = svc.fit_and_project(&points).unwrap();

        let months: Vec<NaiveDate> = rows.iter().map(|r| r.forecast_date).collect();
        assert_eq!(
            months,
            vec![
                NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn year_boundary_rolls_over() {
        let svc = service_with_seed(4).await;
        let product = Uuid::new_v4();
        let points = vec![point(product, 2025, 11, 20), point(product, 2025, 12, 25)];

        let rows = svc.fit_and_project(&points).unwrap();

        let months: Vec<NaiveDate> = rows.iter().map(|r| r.forecast_date).collect();
        assert_eq!(
            months,
            vec![
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn predictions_stay_within_observed_quantity_range() {
        let svc = service_with_seed(5).await;
        let product = Uuid::new_v4();
        let points = vec![
            point(product, 2026, 1, 10),
            point(product, 2026, 2, 30),
            point(product, 2026, 3, 20),
            point(product, 2026, 4, 25),
        ];

        let rows = svc.fit_and_project(&points).unwrap();

        for row in rows {
            assert!((10..=30).contains(&row.estimated_demand));
        }
    }

    #[tokio::test]
    async fn same_seed_gives_identical_forecasts() {
        let product = Uuid::new_v4();
        let points = vec![
            point(product, 2026, 1, 7),
            point(product, 2026, 2, 13),
            point(product, 2026, 3, 9),
        ];

        let a = service_with_seed(99).await.fit_and_project(&points).unwrap();
        let b = service_with_seed(99).await.fit_and_project(&points).unwrap();
        assert_eq!(a, b);
    }
}
