use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Price in cents; NULL when the product has no listed price.
    pub price_cents: Option<i64>,
    /// Blob path of the product image, e.g. `productos/pan_imagen.jpg`.
    pub image_path: Option<String>,

    #[sea_orm(default_value = true, indexed)]
    pub active: bool,
    #[sea_orm(default_value = 0)]
    pub display_order: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
