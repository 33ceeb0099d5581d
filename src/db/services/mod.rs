//! The `services` module provides a high-level API for interacting with the database.
//! It encapsulates all the SQL logic and data access patterns, allowing the rest of
//! the application (HTTP handlers) to work with domain models without needing to
//! know about the underlying schema or queries.
//!
//! Every function that touches a user-owned row takes the owner's id and filters
//! on it, so a row belonging to another user behaves exactly like a missing row.

pub mod item_service;
pub mod tag_service;
pub mod user_service;

pub use item_service::*;
pub use tag_service::*;
pub use user_service::*;
