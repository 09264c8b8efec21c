pub mod countries;
pub mod hotels;
pub mod paging;
pub mod users;
