pub mod product;
pub mod product_comment;
pub mod product_vote;
pub mod user;
