//! Product catalog: persistence backends and the record lifecycle that keeps
//! product images in step with product records.

mod error;
mod lifecycle;
mod relational;
mod repository;
mod supabase;

pub use error::CatalogError;
pub use lifecycle::{CatalogService, ImageChange};
pub use relational::RelationalProductRepository;
pub use repository::{
    NewProduct, Product, ProductChanges, ProductFilter, ProductPage, ProductRepository,
    RepositoryError,
};
pub use supabase::SupabaseProductRepository;
