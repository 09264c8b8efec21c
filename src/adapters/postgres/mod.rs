pub mod models;
pub mod repositories;
pub mod schema;
pub mod specifications;
