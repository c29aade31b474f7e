pub mod auth;
pub mod comment;
pub mod product;
pub mod shared;
pub mod vote;
