use anyhow::{Context, bail};
use catalog_server::catalog::{
    NewProduct, ProductFilter, ProductRepository, RelationalProductRepository,
    SupabaseProductRepository,
};
use catalog_server::config::AppConfig;
use catalog_server::database;
use catalog_server::models::auth::validate_password;
use catalog_server::seed::{self, StaffOutcome};
use common::storage::{BlobPath, open_blob_store};
use common::supabase::SupabaseClient;
use tracing::{debug, info};

const MIGRATION_PAGE_SIZE: u64 = 100;

fn supabase_client(config: &AppConfig) -> anyhow::Result<Option<SupabaseClient>> {
    match (&config.supabase, config.uses_supabase()) {
        (Some(section), _) => Ok(Some(SupabaseClient::new(section)?)),
        (None, true) => bail!("the configured backends need a [supabase] section"),
        (None, false) => Ok(None),
    }
}

pub async fn storage_check(config: &AppConfig) -> anyhow::Result<()> {
    let client = supabase_client(config)?;
    let bucket = config.supabase.as_ref().map(|s| s.bucket.as_str());
    let store = open_blob_store(&config.storage, client.as_ref().zip(bucket)).await?;

    let path = BlobPath::parse(&format!(
        "storage-check/check-{}.txt",
        chrono::Utc::now().timestamp_millis()
    ))?;
    let payload = b"catalog storage check";
    println!("backend: {}", store.backend_name());

    store.put(&path, payload).await.context("put failed")?;
    println!("put     {path} ok");

    let exists = store.exists(&path).await.context("exists failed")?;
    println!("exists  {exists}");

    let size = store.size(&path).await.context("size failed")?;
    println!("size    {size:?}");

    println!("url     {}", store.public_url(&path));

    let deleted = store.delete(&path).await.context("delete failed")?;
    println!("delete  {deleted}");

    let gone = !store.exists(&path).await.context("exists failed")?;
    println!("gone    {gone}");

    if !exists || size != Some(payload.len() as u64) || !deleted || !gone {
        bail!("storage backend '{}' did not behave as expected", store.backend_name());
    }
    println!("storage check passed");
    Ok(())
}

/// Copy all products from `source` to `target` in listing order.
/// Image paths are copied as references. Returns the number of products.
pub async fn copy_products(
    source: &dyn ProductRepository,
    target: &dyn ProductRepository,
    dry_run: bool,
) -> anyhow::Result<u64> {
    let filter = ProductFilter { active_only: false };
    let mut copied = 0;
    let mut page = 1;

    loop {
        let batch = source.list(filter, page, MIGRATION_PAGE_SIZE).await?;
        if batch.items.is_empty() {
            break;
        }

        for product in batch.items {
            debug!(id = product.id, title = %product.title, dry_run, "Copying product");
            if !dry_run {
                target
                    .insert(NewProduct {
                        title: product.title,
                        description: product.description,
                        price: product.price,
                        image_path: product.image_path,
                        active: product.active,
                        display_order: product.display_order,
                        created_at: Some(product.created_at),
                    })
                    .await
                    .with_context(|| format!("failed to copy product {}", product.id))?;
            }
            copied += 1;
        }

        if page * MIGRATION_PAGE_SIZE >= batch.total {
            break;
        }
        page += 1;
    }

    Ok(copied)
}

pub async fn migrate_supabase(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let section = config
        .supabase
        .as_ref()
        .context("migrate-supabase needs a [supabase] section")?;
    let client = SupabaseClient::new(section)?;

    let db = database::init_db(&config.database.url).await?;
    let source = RelationalProductRepository::new(db);
    let target = SupabaseProductRepository::new(client, section.products_table.clone());

    let copied = copy_products(&source, &target, dry_run).await?;
    if dry_run {
        info!(products = copied, "Dry run: nothing written");
    } else {
        info!(products = copied, table = %section.products_table, "Products copied");
    }
    Ok(())
}

pub async fn create_admin(config: &AppConfig, username: &str, password: &str) -> anyhow::Result<()> {
    validate_password(password).map_err(|_| anyhow::anyhow!("password must be 8-128 characters"))?;

    let db = database::init_db(&config.database.url).await?;
    match seed::ensure_staff_user(&db, username, password, true).await? {
        StaffOutcome::Created => info!(username, "Staff account created"),
        StaffOutcome::Promoted => info!(username, "Account promoted to staff"),
        StaffOutcome::Unchanged => info!(username, "Staff password updated"),
    }
    Ok(())
}
