//! Core types and shared functionality for cachesnap.
//!
//! This crate provides:
//! - The snapshot data model and entry normalization
//! - Unified error types
//! - Configuration structures
//! - JSON output for finished snapshots

pub mod config;
pub mod error;
pub mod model;
pub mod output;

pub use config::{AppConfig, ConfigError, Surface};
pub use error::{CollectionError, Error};
pub use model::{CacheContainer, CacheEntry, RawCacheEntry, Snapshot, SnapshotSummary, format_size};
pub use output::write_snapshot;
