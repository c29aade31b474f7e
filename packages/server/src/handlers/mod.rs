pub mod admin;
pub mod auth;
pub mod comment;
pub mod media;
pub mod product;
pub mod vote;
