//! Repositories over the SQLite pool.
//!
//! ## Tables
//!
//! - `products` - the catalog
//! - `cart_items` - session-keyed cart rows, unique per (product, session)
//! - `admins` - administrator accounts (bcrypt hashes)
//! - `admin_sessions` - bearer tokens issued on admin login
//!
//! The schema itself is created by [`crate::db::init_db`].

pub mod admins;
pub mod cart;
pub mod products;

use thiserror::Error;

pub use admins::AdminRepository;
pub use cart::CartRepository;
pub use products::ProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g. duplicate username).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Input rejected before reaching the database.
    #[error("invalid {field}: {message}")]
    Invalid { field: String, message: String },

    /// Password hashing or verification failed.
    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    /// A blocking task (password hashing) panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
