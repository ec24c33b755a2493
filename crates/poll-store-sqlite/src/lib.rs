//! SQLite backend for the survey response store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Opening a store reconciles the table
//! to the requested [`Shape`](poll_core::schema::Shape) before it is handed
//! out.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
