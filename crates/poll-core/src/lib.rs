//! Core types and engines for the housing survey.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod error;
pub mod intake;
pub mod location;
pub mod moderation;
pub mod response;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
