use sea_orm::sea_query::Index;
use sea_orm::*;
use tracing::{info, warn};

use crate::accounts::{self, AccountError};
use crate::config::BootstrapAdminConfig;
use crate::entity::{product, product_comment, user};

/// What [`ensure_staff_user`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffOutcome {
    Created,
    Promoted,
    Unchanged,
}

/// Create `username` as a staff account, or promote an existing account.
///
/// An existing account keeps its password unless `reset_password` is set.
pub async fn ensure_staff_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    reset_password: bool,
) -> Result<StaffOutcome, AccountError> {
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;

    let Some(existing) = existing else {
        accounts::create_user(db, username, password, true).await?;
        return Ok(StaffOutcome::Created);
    };

    if existing.is_staff && !reset_password {
        return Ok(StaffOutcome::Unchanged);
    }

    let was_staff = existing.is_staff;
    let mut active: user::ActiveModel = existing.into();
    active.is_staff = Set(true);
    if reset_password {
        active.password = Set(accounts::hash_password(password).await?);
    }
    active.update(db).await?;

    Ok(if was_staff {
        StaffOutcome::Unchanged
    } else {
        StaffOutcome::Promoted
    })
}

/// Seed the configured bootstrap staff account.
pub async fn seed_bootstrap_admin(
    db: &DatabaseConnection,
    admin: &BootstrapAdminConfig,
) -> Result<(), AccountError> {
    match ensure_staff_user(db, &admin.username, &admin.password, false).await? {
        StaffOutcome::Created => info!(username = %admin.username, "Seeded bootstrap admin"),
        StaffOutcome::Promoted => info!(username = %admin.username, "Promoted bootstrap admin to staff"),
        StaffOutcome::Unchanged => {}
    }
    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    // Daily comment limit:
    // SELECT COUNT(*) FROM product_comment WHERE product_id = ? AND client_id = ? AND created_at >= ?
    let comment_limit = Index::create()
        .if_not_exists()
        .name("idx_product_comment_client_day")
        .table(product_comment::Entity)
        .col(product_comment::Column::ProductId)
        .col(product_comment::Column::ClientId)
        .col(product_comment::Column::CreatedAt)
        .to_owned();

    // Public listing order.
    let listing = Index::create()
        .if_not_exists()
        .name("idx_product_listing")
        .table(product::Entity)
        .col(product::Column::Active)
        .col(product::Column::DisplayOrder)
        .col(product::Column::CreatedAt)
        .to_owned();

    for (name, stmt) in [
        ("idx_product_comment_client_day", comment_limit),
        ("idx_product_listing", listing),
    ] {
        match db.execute_raw(backend.build(&stmt)).await {
            Ok(_) => info!("Ensured index {name} exists"),
            Err(e) => warn!("Failed to create index {name}: {e}"),
        }
    }

    Ok(())
}
