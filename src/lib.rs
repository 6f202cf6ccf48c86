mod auth;
mod case_insensitive_string_ext;
mod config;
mod error;
mod password;
mod postgres;
mod routes;
mod store;
mod token;
mod types;

pub use auth::*;
pub use config::*;
pub use error::*;
pub use password::*;
pub use postgres::*;
pub use routes::*;
pub use store::*;
pub use token::*;
pub use types::*;
