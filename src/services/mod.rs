pub mod auth;
pub mod countries;
pub mod hotels;
pub mod users;
