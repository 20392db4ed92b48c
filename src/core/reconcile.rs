//! Customer reconciliation: folds two sources' customers into one ledger,
//! routes orders to the merged identities and derives `last_contacted`.

use crate::core::dates::parse_datetime;
use crate::domain::model::{
    Customer, CustomerId, ExternalCustomerRecord, ExternalOrderRecord, LineItem, Order,
    Reconciliation, SkippedOrder, SourceBatch, SourceRef,
};
use std::collections::HashMap;

/// Dedup key: trimmed, lowercased name and email. A missing email counts as
/// the empty string, so same-name customers without an email share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub name: String,
    pub email: String,
}

impl IdentityKey {
    pub fn of(record: &ExternalCustomerRecord) -> Self {
        Self {
            name: record.name.trim().to_lowercase(),
            email: record
                .email
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_lowercase(),
        }
    }
}

pub fn reconcile_batches(source_a: &SourceBatch, source_b: &SourceBatch) -> Reconciliation {
    reconcile(
        &source_a.customers,
        &source_b.customers,
        &source_a.orders,
        &source_b.orders,
    )
}

/// First record seen for a key is kept verbatim; later ones only contribute
/// their external id to the identity map. When one external id shows up under
/// several keys, the last kept record owns it.
pub fn reconcile(
    customers_a: &[ExternalCustomerRecord],
    customers_b: &[ExternalCustomerRecord],
    orders_a: &[ExternalOrderRecord],
    orders_b: &[ExternalOrderRecord],
) -> Reconciliation {
    let mut ledger = Reconciliation::default();
    let mut by_key: HashMap<IdentityKey, CustomerId> = HashMap::new();

    for record in customers_a.iter().chain(customers_b) {
        let key = IdentityKey::of(record);
        let reference = SourceRef::new(record.source, record.external_id.clone());

        match by_key.get(&key) {
            Some(id) => {
                ledger.merged_records += 1;
                ledger.identities.entry(reference).or_insert(*id);
            }
            None => {
                let id = CustomerId(ledger.customers.len() as i64 + 1);
                ledger.customers.push(Customer {
                    id,
                    external_id: record.external_id.clone(),
                    name: record.name.clone(),
                    email: record.email.clone(),
                    phone: record.phone.clone(),
                    address: record.address.clone(),
                    source: record.source,
                    last_contacted: None,
                });
                by_key.insert(key, id);
                // 同一個外部 id 換了 email 時，訂單跟著最新的客戶資料走
                ledger.identities.insert(reference, id);
            }
        }
    }

    tracing::info!(
        "🔗 Merged {} customer records into {} customers",
        customers_a.len() + customers_b.len(),
        ledger.customers.len()
    );

    for (index, order) in orders_a.iter().chain(orders_b).enumerate() {
        let customer_id = order.customer_external_id.as_deref().and_then(|ext| {
            ledger
                .identities
                .get(&SourceRef::new(order.source, ext))
                .copied()
        });

        let Some(customer_id) = customer_id else {
            tracing::warn!(
                "Skipping {} order #{} ({}): no customer for external id {:?}",
                order.source,
                index,
                order.external_id,
                order.customer_external_id
            );
            ledger.skipped.push(SkippedOrder {
                source: order.source,
                external_id: order.external_id.clone(),
                customer_external_id: order.customer_external_id.clone(),
            });
            continue;
        };

        let created_at = order.created_at.as_deref().and_then(parse_datetime);
        let due_date = order.due_date.as_deref().and_then(parse_datetime);

        if let Some(ts) = created_at {
            ledger
                .last_contacted
                .entry(customer_id)
                .and_modify(|latest| {
                    if ts > *latest {
                        *latest = ts;
                    }
                })
                .or_insert(ts);
        }

        ledger.orders.push(Order {
            customer_id,
            external_id: order.external_id.clone(),
            invoice_number: order.invoice_number.clone(),
            status: order.status.clone(),
            currency: order.currency.clone(),
            created_at,
            due_date,
            amount_due: order.amount_due,
            total: order.total,
            tax_total: order.tax_total,
            source: order.source,
            line_items: order.line_items.iter().map(LineItem::from).collect(),
        });
    }

    for customer in &mut ledger.customers {
        customer.last_contacted = ledger.last_contacted.get(&customer.id).copied();
    }

    tracing::info!(
        "📦 Assigned {} orders, skipped {}",
        ledger.orders.len(),
        ledger.skipped.len()
    );

    ledger
}
