pub mod dates;
pub mod engine;
pub mod pipeline;
pub mod reconcile;

pub use crate::domain::model::{Reconciliation, SourceBatch, SyncInput, SyncReport};
pub use crate::domain::ports::{LedgerStore, Pipeline, SourceClient};
pub use crate::utils::error::Result;
