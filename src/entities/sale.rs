use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Sale transaction entity. Rows are created once at entry time and are
/// immutable thereafter; there is no update or delete path.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-facing sale code (receipt/ticket reference)
    pub code: String,

    /// Product sold
    pub product_id: Uuid,

    /// Units sold
    pub quantity: i32,

    /// Unit price snapshot taken from the product at entry time
    pub unit_price: Decimal,

    /// quantity * unit_price at entry time
    pub total: Decimal,

    /// Calendar date of the transaction
    pub sale_date: NaiveDate,

    /// Staff member who recorded the sale
    pub user_id: Uuid,

    /// Row creation timestamp
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
