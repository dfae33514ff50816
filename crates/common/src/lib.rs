//! Skeleton Common Library
//!
//! Domain entities and SQLite persistence shared by the web application and
//! the acceptance test harness.

pub mod db;
pub mod entity;
pub mod error;
pub mod repository;
pub mod util;

// Re-export commonly used types
pub use db::Database;
pub use entity::User;
pub use error::{Error, Result};
pub use repository::UserRepository;

/// Skeleton version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default database path, relative to the project root
pub fn default_db_path() -> std::path::PathBuf {
    std::path::PathBuf::from("var").join("skeleton.db")
}
