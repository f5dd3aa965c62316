//! ideashare/crates/storage-adapters/src/lib.rs
//!
//! Persistence adapters. Both stores implement every repository port, so
//! the binary picks one at startup and hands it to `services::Ports`.

pub mod memory;
#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
