pub mod connection;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod transfer;

pub use connection::{ConnectionManager, ConnectionState};
pub use error::{DbError, Result};
pub use service::RecipeService;

/// Fixed filename of the on-device database.
pub const DATABASE_FILE_NAME: &str = "resepku.db";
