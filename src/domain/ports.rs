use crate::domain::model::{
    InactiveCustomer, OrderSummary, Reconciliation, Source, SourceBatch, StoreSummary,
    StoredCustomer, SyncInput, SyncReport,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Black-box data provider for one external system.
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn source(&self) -> Source;
    async fn fetch(&self) -> Result<SourceBatch>;
}

#[async_trait]
impl SourceClient for Box<dyn SourceClient> {
    fn source(&self) -> Source {
        (**self).source()
    }

    async fn fetch(&self) -> Result<SourceBatch> {
        (**self).fetch().await
    }
}

pub trait LedgerStore: Send + Sync {
    /// Wipes and rewrites the customer, order and line item tables as one
    /// unit. On error the previous contents must still be in place.
    fn replace_all(
        &self,
        ledger: &Reconciliation,
    ) -> impl std::future::Future<Output = Result<StoreSummary>> + Send;

    fn customers(&self) -> impl std::future::Future<Output = Result<Vec<StoredCustomer>>> + Send;

    /// Customers never contacted, or not contacted in the `days` before `as_of`.
    fn inactive_customers(
        &self,
        as_of: DateTime<Utc>,
        days: i64,
    ) -> impl std::future::Future<Output = Result<Vec<InactiveCustomer>>> + Send;

    fn latest_orders(
        &self,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<OrderSummary>>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SyncInput>;
    async fn transform(&self, input: SyncInput) -> Result<Reconciliation>;
    async fn load(&self, ledger: Reconciliation) -> Result<SyncReport>;
}
