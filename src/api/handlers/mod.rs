pub mod auth;
pub mod error;
pub mod health;
pub mod owned;
pub mod trips;
pub mod users;

pub use error::ApiError;
