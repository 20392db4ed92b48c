use crate::core::Pipeline;
use crate::domain::model::{Reconciliation, SyncReport};
use crate::utils::error::{Result, SyncError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Runs a sync pipeline, allowing at most one run at a time.
pub struct SyncEngine<P: Pipeline> {
    pipeline: P,
    running: AtomicBool,
}

/// Releases the run flag on every exit path, including `?` and panics.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::SyncInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: Pipeline> SyncEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            running: AtomicBool::new(false),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let _guard = RunGuard::acquire(&self.running)?;
        let started = Instant::now();

        tracing::info!("🚀 Starting customer sync");

        tracing::info!("Extracting source data...");
        let input = self.pipeline.extract().await?;

        tracing::info!("Reconciling customers...");
        let ledger = self.pipeline.transform(input).await?;

        tracing::info!("Replacing stored ledger...");
        let report = self.pipeline.load(ledger).await?;

        tracing::info!(
            "✅ Sync complete in {:?}: {} customers, {} orders, {} skipped",
            started.elapsed(),
            report.customers,
            report.orders,
            report.skipped_orders
        );
        Ok(report)
    }

    /// Extract and reconcile without writing anything.
    pub async fn preview(&self) -> Result<Reconciliation> {
        let _guard = RunGuard::acquire(&self.running)?;

        tracing::info!("🔍 Dry run: extracting and reconciling only");
        let input = self.pipeline.extract().await?;
        self.pipeline.transform(input).await
    }
}
