use crate::{
    db::DbPool,
    entities::{
        product::{self, Column as ProductColumn, Entity as Product, ProductStatus},
        sale::{self, Column as SaleColumn, Entity as Sale},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// New sale transaction. Unit price and total are not accepted from the
/// caller: the price is snapshotted from the product at entry time.
#[derive(Debug, Clone)]
pub struct RecordSale {
    pub code: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub sale_date: NaiveDate,
}

/// Sale listing filters; all optional and combinable
#[derive(Debug, Clone, Default)]
pub struct SaleListParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub code: Option<String>,
    pub product: Option<String>,
    pub page: u64,
    pub limit: u64,
}

/// Sale row joined with its product for display
#[derive(Debug, Serialize, ToSchema)]
pub struct SaleWithProduct {
    pub id: Uuid,
    pub code: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub brand: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub sale_date: NaiveDate,
    pub user_id: Uuid,
}

/// Service for recording and querying sales. Sales are immutable once
/// written; there is no update or delete path.
pub struct SaleService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl SaleService {
    /// Creates a new sale service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Record a sale on behalf of the authenticated staff member
    #[instrument(skip(self))]
    pub async fn record_sale(
        &self,
        user_id: Uuid,
        input: RecordSale,
    ) -> Result<sale::Model, ServiceError> {
        let db = &*self.db_pool;

        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if input.code.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Sale code is required".to_string(),
            ));
        }

        let product = Product::find_by_id(input.product_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(product_id = %input.product_id, error = %e, "Database error when finding product");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Product with ID {} does not exist",
                    input.product_id
                ))
            })?;

        if product.status != ProductStatus::Active {
            return Err(ServiceError::ValidationError(format!(
                "Product '{}' is inactive and cannot be sold",
                product.name
            )));
        }

        let unit_price = product.price;
        let total = unit_price * Decimal::from(input.quantity);

        let sale = sale::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(input.code),
            product_id: Set(input.product_id),
            quantity: Set(input.quantity),
            unit_price: Set(unit_price),
            total: Set(total),
            sale_date: Set(input.sale_date),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };

        let result = sale.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to record sale");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send(Event::SaleRecorded {
                sale_id: result.id,
                product_id: result.product_id,
                quantity: result.quantity,
            })
            .await;

        info!(sale_id = %result.id, code = %result.code, "Sale recorded successfully");

        Ok(result)
    }

    /// List sales joined to their products, newest first
    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        params: SaleListParams,
    ) -> Result<(Vec<SaleWithProduct>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Sale::find().find_also_related(Product);

        if let Some(from) = params.from {
            query = query.filter(SaleColumn::SaleDate.gte(from));
        }
        if let Some(to) = params.to {
            query = query.filter(SaleColumn::SaleDate.lte(to));
        }
        if let Some(code) = params.code.as_deref() {
            if !code.trim().is_empty() {
                let pattern = format!("%{}%", code.to_lowercase());
                query = query.filter(
                    Expr::expr(Func::lower(Expr::col((sale::Entity, SaleColumn::Code))))
                        .like(pattern),
                );
            }
        }
        if let Some(product) = params.product.as_deref() {
            if !product.trim().is_empty() {
                let pattern = format!("%{}%", product.to_lowercase());
                query = query.filter(
                    Expr::expr(Func::lower(Expr::col((
                        product::Entity,
                        ProductColumn::Name,
                    ))))
                    .like(pattern),
                );
            }
        }

        query = query
            .order_by_desc(SaleColumn::SaleDate)
            .order_by_desc(SaleColumn::CreatedAt);

        let paginator = query.paginate(db, params.limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Database error when counting sales");
            ServiceError::DatabaseError(e)
        })?;

        let rows = paginator
            .fetch_page(params.page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(page = params.page, error = %e, "Database error when fetching sales");
                ServiceError::DatabaseError(e)
            })?;

        let sales = rows
            .into_iter()
            .map(|(sale, product)| {
                let (product_name, brand) = product
                    .map(|p| (p.name, p.brand))
                    .unwrap_or_else(|| ("(deleted)".to_string(), String::new()));
                SaleWithProduct {
                    id: sale.id,
                    code: sale.code,
                    product_id: sale.product_id,
                    product_name,
                    brand,
                    quantity: sale.quantity,
                    unit_price: sale.unit_price,
                    total: sale.total,
                    sale_date: sale.sale_date,
                    user_id: sale.user_id,
                }
            })
            .collect();

        Ok((sales, total))
    }
}
