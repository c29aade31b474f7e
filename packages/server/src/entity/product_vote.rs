use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One like/dislike per (product, client identity).
///
/// `product_id` carries no foreign key: products may live in the remote
/// catalog backend instead of this database.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub client_id: String,

    /// "like" or "dislike".
    pub kind: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
