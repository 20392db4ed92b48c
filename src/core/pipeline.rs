use crate::core::reconcile::reconcile_batches;
use crate::core::{LedgerStore, Pipeline, SourceClient};
use crate::domain::model::{Reconciliation, SourceBatch, SyncInput, SyncReport};
use crate::utils::error::{Result, SyncError};

/// Two-source sync: fetch both sides in full, reconcile, then replace the
/// stored ledger in one transaction.
pub struct SyncPipeline<A: SourceClient, B: SourceClient, S: LedgerStore> {
    source_a: A,
    source_b: B,
    store: S,
}

impl<A: SourceClient, B: SourceClient, S: LedgerStore> SyncPipeline<A, B, S> {
    pub fn new(source_a: A, source_b: B, store: S) -> Self {
        Self {
            source_a,
            source_b,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

async fn fetch_checked<C: SourceClient>(client: &C) -> Result<SourceBatch> {
    let expected = client.source();
    tracing::info!("⬇️  Fetching {} customers and orders", expected);

    let batch = client.fetch().await?;
    if batch.source != expected {
        return Err(SyncError::source_failure(
            expected,
            format!("client returned a {} batch", batch.source),
        ));
    }

    tracing::info!(
        "✅ {}: {} customers, {} orders",
        expected,
        batch.customers.len(),
        batch.orders.len()
    );
    Ok(batch)
}

#[async_trait::async_trait]
impl<A: SourceClient, B: SourceClient, S: LedgerStore> Pipeline for SyncPipeline<A, B, S> {
    async fn extract(&self) -> Result<SyncInput> {
        // 兩邊都完整抓完才往下走，任何一邊失敗就不動資料庫
        let source_a = fetch_checked(&self.source_a).await?;
        let source_b = fetch_checked(&self.source_b).await?;

        Ok(SyncInput { source_a, source_b })
    }

    async fn transform(&self, input: SyncInput) -> Result<Reconciliation> {
        Ok(reconcile_batches(&input.source_a, &input.source_b))
    }

    async fn load(&self, ledger: Reconciliation) -> Result<SyncReport> {
        let report = SyncReport::from_reconciliation(&ledger);
        let written = self.store.replace_all(&ledger).await?;

        tracing::debug!(
            "Ledger written: {} customers, {} orders, {} line items",
            written.customers,
            written.orders,
            written.line_items
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        ExternalCustomerRecord, ExternalOrderRecord, InactiveCustomer, OrderSummary, Source,
        StoreSummary, StoredCustomer,
    };
    use chrono::{DateTime, Utc};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct StaticSource {
        source: Source,
        batch: Option<SourceBatch>,
    }

    #[async_trait::async_trait]
    impl SourceClient for StaticSource {
        fn source(&self) -> Source {
            self.source
        }

        async fn fetch(&self) -> Result<SourceBatch> {
            self.batch
                .clone()
                .ok_or_else(|| SyncError::source_failure(self.source, "HTTP 503"))
        }
    }

    #[derive(Clone, Default)]
    struct MockStore {
        writes: Arc<Mutex<Vec<Reconciliation>>>,
    }

    impl LedgerStore for MockStore {
        async fn replace_all(&self, ledger: &Reconciliation) -> Result<StoreSummary> {
            self.writes.lock().await.push(ledger.clone());
            Ok(StoreSummary {
                customers: ledger.customers.len(),
                orders: ledger.orders.len(),
                line_items: ledger.line_item_count(),
            })
        }

        async fn customers(&self) -> Result<Vec<StoredCustomer>> {
            Ok(vec![])
        }

        async fn inactive_customers(
            &self,
            _as_of: DateTime<Utc>,
            _days: i64,
        ) -> Result<Vec<InactiveCustomer>> {
            Ok(vec![])
        }

        async fn latest_orders(&self, _limit: usize) -> Result<Vec<OrderSummary>> {
            Ok(vec![])
        }
    }

    fn wave_batch() -> SourceBatch {
        SourceBatch {
            source: Source::Wave,
            customers: vec![ExternalCustomerRecord {
                external_id: "a1".to_string(),
                name: "Jane Doe".to_string(),
                email: Some("jane@x.com".to_string()),
                phone: None,
                address: None,
                source: Source::Wave,
            }],
            orders: vec![ExternalOrderRecord {
                external_id: "inv-1".to_string(),
                invoice_number: Some("1001".to_string()),
                status: Some("PAID".to_string()),
                currency: Some("USD".to_string()),
                created_at: Some("2024-06-15T12:00:00Z".to_string()),
                due_date: Some("2024-07-15".to_string()),
                customer_external_id: Some("a1".to_string()),
                amount_due: Some(0.0),
                total: Some(120.0),
                tax_total: Some(10.0),
                line_items: vec![],
                source: Source::Wave,
            }],
        }
    }

    #[tokio::test]
    async fn test_extract_transform_load() {
        let store = MockStore::default();
        let pipeline = SyncPipeline::new(
            StaticSource {
                source: Source::Wave,
                batch: Some(wave_batch()),
            },
            StaticSource {
                source: Source::BigCommerce,
                batch: Some(SourceBatch::empty(Source::BigCommerce)),
            },
            store.clone(),
        );

        let input = pipeline.extract().await.unwrap();
        let ledger = pipeline.transform(input).await.unwrap();
        let report = pipeline.load(ledger).await.unwrap();

        assert_eq!(report.customers, 1);
        assert_eq!(report.orders, 1);
        assert_eq!(report.undated_customers, 0);
        assert_eq!(store.writes.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_fails_when_second_source_fails() {
        let pipeline = SyncPipeline::new(
            StaticSource {
                source: Source::Wave,
                batch: Some(wave_batch()),
            },
            StaticSource {
                source: Source::BigCommerce,
                batch: None,
            },
            MockStore::default(),
        );

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::SourceError {
                origin: Source::BigCommerce,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_extract_rejects_mislabelled_batch() {
        let pipeline = SyncPipeline::new(
            StaticSource {
                source: Source::BigCommerce,
                batch: Some(wave_batch()),
            },
            StaticSource {
                source: Source::Wave,
                batch: Some(wave_batch()),
            },
            MockStore::default(),
        );

        assert!(pipeline.extract().await.is_err());
    }
}
