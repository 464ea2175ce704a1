//! # session-db
//!
//! Storage layer implementing the session-core ports.
//!
//! ## Overview
//!
//! - PostgreSQL via SQLx: connection pool, runtime migrations, row models,
//!   model → entity mappers and the repository implementations
//! - An in-memory store with the same transactional behaviour
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_db::{create_pool, run_migrations, PgSessionStore, PgUserRepository, PoolConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&PoolConfig::new("postgres://localhost/sessions")).await?;
//!     run_migrations(&pool).await?;
//!
//!     let users = PgUserRepository::new(pool.clone());
//!     let sessions = PgSessionStore::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::MemoryStore;
pub use pool::{create_pool, run_migrations, PgPool, PoolConfig};
pub use repositories::{PgSessionStore, PgSessionTx, PgUserRepository};
