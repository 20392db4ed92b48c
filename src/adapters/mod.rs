// Adapters layer: concrete implementations of the domain ports (sources, ledger storage, export).

pub mod amount;
pub mod bigcommerce;
pub mod csv_export;
pub mod snapshot;
pub mod sqlite_store;
pub mod wave;

pub use bigcommerce::BigCommerceClient;
pub use snapshot::SnapshotSource;
pub use sqlite_store::SqliteStore;
pub use wave::WaveClient;

use crate::config::toml_config::{BigCommerceConfig, WaveConfig};
use crate::core::SourceClient;
use crate::domain::model::Source;
use crate::utils::error::Result;

/// Live API client, or the snapshot reader when a snapshot path is configured.
pub fn wave_source(config: &WaveConfig) -> Result<Box<dyn SourceClient>> {
    let source: Box<dyn SourceClient> = match &config.snapshot {
        Some(path) => Box::new(SnapshotSource::new(Source::Wave, path)),
        None => Box::new(WaveClient::new(config.clone())?),
    };
    Ok(source)
}

pub fn bigcommerce_source(config: &BigCommerceConfig) -> Result<Box<dyn SourceClient>> {
    let source: Box<dyn SourceClient> = match &config.snapshot {
        Some(path) => Box::new(SnapshotSource::new(Source::BigCommerce, path)),
        None => Box::new(BigCommerceClient::new(config.clone())?),
    };
    Ok(source)
}
