use async_trait::async_trait;
use chrono::Utc;
use common::storage::BlobPath;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::*;

use super::repository::{
    NewProduct, Product, ProductChanges, ProductFilter, ProductPage, ProductRepository,
    RepositoryError, page_offset,
};
use crate::entity::product;

/// Products stored in the application database through SeaORM.
pub struct RelationalProductRepository {
    db: DatabaseConnection,
}

impl RelationalProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn price_to_cents(price: Decimal) -> Result<i64, RepositoryError> {
    (price * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| RepositoryError::InvalidRow(format!("price {price} out of range")))
}

fn cents_to_price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn to_product(model: product::Model) -> Result<Product, RepositoryError> {
    let image_path = model
        .image_path
        .as_deref()
        .map(BlobPath::parse)
        .transpose()
        .map_err(|e| RepositoryError::InvalidRow(format!("product {}: {e}", model.id)))?;

    Ok(Product {
        id: model.id,
        title: model.title,
        description: model.description,
        price: model.price_cents.map(cents_to_price),
        image_path,
        active: model.active,
        display_order: model.display_order,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

#[async_trait]
impl ProductRepository for RelationalProductRepository {
    fn backend_name(&self) -> &'static str {
        "relational"
    }

    async fn list(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<ProductPage, RepositoryError> {
        let mut select = product::Entity::find();
        if filter.active_only {
            select = select.filter(product::Column::Active.eq(true));
        }

        let total = select.clone().count(&self.db).await?;

        let models = select
            .order_by_asc(product::Column::DisplayOrder)
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .offset(Some(page_offset(page, per_page)))
            .limit(Some(per_page))
            .all(&self.db)
            .await?;

        let items = models
            .into_iter()
            .map(to_product)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProductPage { items, total })
    }

    async fn get(&self, id: i64) -> Result<Option<Product>, RepositoryError> {
        product::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(to_product)
            .transpose()
    }

    async fn insert(&self, new: NewProduct) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let model = product::ActiveModel {
            title: Set(new.title),
            description: Set(new.description),
            price_cents: Set(new.price.map(price_to_cents).transpose()?),
            image_path: Set(new.image_path.map(|p| p.as_str().to_string())),
            active: Set(new.active),
            display_order: Set(new.display_order),
            created_at: Set(new.created_at.unwrap_or(now)),
            updated_at: Set(now),
            ..Default::default()
        };

        to_product(model.insert(&self.db).await?)
    }

    async fn update(&self, id: i64, changes: ProductChanges) -> Result<Product, RepositoryError> {
        let existing = product::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;

        let mut model: product::ActiveModel = existing.into();
        if let Some(title) = changes.title {
            model.title = Set(title);
        }
        if let Some(description) = changes.description {
            model.description = Set(description);
        }
        if let Some(price) = changes.price {
            model.price_cents = Set(price.map(price_to_cents).transpose()?);
        }
        if let Some(image_path) = changes.image_path {
            model.image_path = Set(image_path.map(|p| p.as_str().to_string()));
        }
        if let Some(active) = changes.active {
            model.active = Set(active);
        }
        if let Some(display_order) = changes.display_order {
            model.display_order = Set(display_order);
        }
        model.updated_at = Set(Utc::now());

        match model.update(&self.db).await {
            Ok(updated) => to_product(updated),
            Err(DbErr::RecordNotUpdated) => Err(RepositoryError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = product::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
