//! Service layer shared by every entry point.

mod database;

pub use database::{DatabaseService, DEFAULT_STORE_TIMEOUT};
