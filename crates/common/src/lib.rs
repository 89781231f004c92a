//! Common utilities and shared types for yatube.
//!
//! This crate provides foundational components used across all yatube crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Storage**: Local filesystem storage for uploaded post images
//! - **Page cache**: Short-lived full-response cache for the home feed
//!
//! # Example
//!
//! ```no_run
//! use yatube_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod page_cache;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use page_cache::{CachedPage, MemoryPageCache, PageCache, PageCacheBackend, RedisPageCache};
pub use storage::{LocalStorage, StorageBackend, StoredFile, sanitize_file_name, unique_storage_key};
