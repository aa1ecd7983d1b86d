//! Data layer module
//!
//! Handles persistence of provider-linked users in SQLite.

mod database;
mod models;

pub use database::Database;
pub use models::*;
