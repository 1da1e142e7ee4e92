use crate::{
    db::DbPool,
    entities::product::{self, Column as ProductColumn, Entity as Product, ProductStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Filterable catalog fields. User-supplied field names deserialize into
/// this allow-list; anything else is rejected before a query is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductFilterField {
    Name,
    Brand,
    Category,
}

impl ProductFilterField {
    fn column(self) -> ProductColumn {
        match self {
            ProductFilterField::Name => ProductColumn::Name,
            ProductFilterField::Brand => ProductColumn::Brand,
            ProductFilterField::Category => ProductColumn::Category,
        }
    }
}

/// Sortable catalog fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortField {
    Name,
    Stock,
    CreatedAt,
}

impl ProductSortField {
    fn column(self) -> ProductColumn {
        match self {
            ProductSortField::Name => ProductColumn::Name,
            ProductSortField::Stock => ProductColumn::Stock,
            ProductSortField::CreatedAt => ProductColumn::CreatedAt,
        }
    }
}

/// New catalog entry
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub name: String,
    pub category: String,
    pub brand: String,
    pub stock: i32,
    pub stock_min: i32,
    pub price: Decimal,
}

/// Catalog update; None fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub stock: Option<i32>,
    pub stock_min: Option<i32>,
    pub price: Option<Decimal>,
    pub status: Option<ProductStatus>,
}

/// Catalog listing parameters
#[derive(Debug, Clone)]
pub struct ProductListParams {
    pub page: u64,
    pub limit: u64,
    pub filter_field: Option<ProductFilterField>,
    pub filter_value: Option<String>,
    pub sort_by: ProductSortField,
    pub sort_desc: bool,
    pub include_inactive: bool,
}

/// Service for managing the product catalog
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl ProductService {
    /// Creates a new product service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Create a new product
    #[instrument(skip(self))]
    pub async fn create_product(&self, input: CreateProduct) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;

        if input.stock < 0 || input.stock_min < 0 {
            return Err(ServiceError::ValidationError(
                "Stock levels cannot be negative".to_string(),
            ));
        }
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            category: Set(input.category),
            brand: Set(input.brand),
            stock: Set(input.stock),
            stock_min: Set(input.stock_min),
            price: Set(input.price),
            status: Set(ProductStatus::Active),
            created_at: Set(Utc::now()),
        };

        let result = product.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create product");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender.send(Event::ProductCreated(result.id)).await;

        info!(product_id = %result.id, name = %result.name, "Product created successfully");

        Ok(result)
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<Option<product::Model>, ServiceError> {
        let db = &*self.db_pool;

        Product::find_by_id(id)
            .one(db)
            .await
            .map_err(|e| {
                error!(product_id = %id, error = %e, "Database error when fetching product");
                ServiceError::DatabaseError(e)
            })
    }

    /// List products with allow-listed filtering/sorting and pagination
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        params: ProductListParams,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Product::find();

        if !params.include_inactive {
            query = query.filter(ProductColumn::Status.eq(ProductStatus::Active));
        }

        if let (Some(field), Some(value)) = (params.filter_field, params.filter_value.as_deref()) {
            if !value.trim().is_empty() {
                query = query.filter(contains_ignore_case(field.column(), value));
            }
        }

        let column = params.sort_by.column();
        query = if params.sort_desc {
            query.order_by_desc(column)
        } else {
            query.order_by_asc(column)
        };

        let paginator = query.paginate(db, params.limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Database error when counting products");
            ServiceError::DatabaseError(e)
        })?;

        let products = paginator
            .fetch_page(params.page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(page = params.page, error = %e, "Database error when fetching products");
                ServiceError::DatabaseError(e)
            })?;

        Ok((products, total))
    }

    /// Update a product
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProduct,
    ) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;

        let product = Product::find_by_id(id)
            .one(db)
            .await
            .map_err(|e| {
                error!(product_id = %id, error = %e, "Database error when finding product");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with ID {} not found", id)))?;

        let mut product: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            product.name = Set(name);
        }
        if let Some(category) = input.category {
            product.category = Set(category);
        }
        if let Some(brand) = input.brand {
            product.brand = Set(brand);
        }
        if let Some(stock) = input.stock {
            if stock < 0 {
                return Err(ServiceError::ValidationError(
                    "Stock levels cannot be negative".to_string(),
                ));
            }
            product.stock = Set(stock);
        }
        if let Some(stock_min) = input.stock_min {
            if stock_min < 0 {
                return Err(ServiceError::ValidationError(
                    "Stock levels cannot be negative".to_string(),
                ));
            }
            product.stock_min = Set(stock_min);
        }
        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Price cannot be negative".to_string(),
                ));
            }
            product.price = Set(price);
        }
        if let Some(status) = input.status {
            product.status = Set(status);
        }

        let updated = product.update(db).await.map_err(|e| {
            error!(product_id = %id, error = %e, "Database error when updating product");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender.send(Event::ProductUpdated(updated.id)).await;

        info!(product_id = %updated.id, "Product updated successfully");

        Ok(updated)
    }

    /// Soft-delete a product by flipping its status to inactive.
    /// The row (and its sales history) stays in place.
    #[instrument(skip(self))]
    pub async fn deactivate_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;

        let product = Product::find_by_id(id)
            .one(db)
            .await
            .map_err(|e| {
                error!(product_id = %id, error = %e, "Database error when finding product");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with ID {} not found", id)))?;

        let mut product: product::ActiveModel = product.into();
        product.status = Set(ProductStatus::Inactive);

        let updated = product.update(db).await.map_err(|e| {
            error!(product_id = %id, error = %e, "Database error when deactivating product");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send(Event::ProductDeactivated(updated.id))
            .await;

        info!(product_id = %updated.id, "Product deactivated");

        Ok(updated)
    }

    /// Distinct category values, ordered. This is the enumeration forecast
    /// callers pick from.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<String>, ServiceError> {
        let db = &*self.db_pool;

        Product::find()
            .select_only()
            .column(ProductColumn::Category)
            .distinct()
            .order_by_asc(ProductColumn::Category)
            .into_tuple::<String>()
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error when listing categories");
                ServiceError::DatabaseError(e)
            })
    }

    /// Active products at or below their minimum stock threshold
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db_pool;

        Product::find()
            .filter(ProductColumn::Status.eq(ProductStatus::Active))
            .filter(Expr::col(ProductColumn::Stock).lte(Expr::col(ProductColumn::StockMin)))
            .order_by_asc(ProductColumn::Stock)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error when listing low-stock products");
                ServiceError::DatabaseError(e)
            })
    }
}

/// Case-insensitive substring condition on an allow-listed column
fn contains_ignore_case(column: ProductColumn, value: &str) -> Condition {
    let pattern = format!("%{}%", value.to_lowercase());
    Condition::all().add(Expr::expr(Func::lower(Expr::col(column))).like(pattern))
}
