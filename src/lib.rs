pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{CliArgs, Command};
pub use crate::config::SyncConfig;

pub use crate::adapters::{BigCommerceClient, SnapshotSource, SqliteStore, WaveClient};
pub use crate::core::{engine::SyncEngine, pipeline::SyncPipeline, reconcile::reconcile};
pub use crate::utils::error::{Result, SyncError};
