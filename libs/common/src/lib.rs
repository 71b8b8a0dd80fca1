//! Common library for the YouTweet backend
//!
//! This crate provides shared functionality used across the services:
//! database connectivity, the document store and its backends, read-model
//! pipelines, the Redis client and error types.

pub mod cache;
pub mod database;
pub mod error;
pub mod path;
pub mod pipeline;
pub mod store;

/// Example usage of the document store
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool, run_migrations};
/// use common::store::{DocumentStore, Filter, PgDocumentStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     run_migrations(&pool).await?;
///     let store = PgDocumentStore::new(pool);
///     let users = store.count("users", &Filter::All).await?;
///     println!("{} users", users);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
