use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// External system a record was pulled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    Wave,
    BigCommerce,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Wave => "Wave",
            Source::BigCommerce => "BigCommerce",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Wave" => Ok(Source::Wave),
            "BigCommerce" => Ok(Source::BigCommerce),
            other => Err(format!("unknown source '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalCustomerRecord {
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineItemRecord {
    pub name: String,
    pub sku: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub total: Option<f64>,
    pub tax: Option<f64>,
    pub vendor: Option<String>,
    pub shipping_method: Option<String>,
}

/// Order or invoice as delivered by a source. Dates stay raw until
/// reconciliation parses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalOrderRecord {
    pub external_id: String,
    pub invoice_number: Option<String>,
    pub status: Option<String>,
    pub currency: Option<String>,
    pub created_at: Option<String>,
    pub due_date: Option<String>,
    pub customer_external_id: Option<String>,
    pub amount_due: Option<f64>,
    pub total: Option<f64>,
    pub tax_total: Option<f64>,
    #[serde(default)]
    pub line_items: Vec<LineItemRecord>,
    pub source: Source,
}

/// Everything one source returned during a single fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceBatch {
    pub source: Source,
    pub customers: Vec<ExternalCustomerRecord>,
    pub orders: Vec<ExternalOrderRecord>,
}

impl SourceBatch {
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            customers: Vec::new(),
            orders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `(source, external id)` pair; external ids are only unique within a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRef {
    pub source: Source,
    pub external_id: String,
}

impl SourceRef {
    pub fn new(source: Source, external_id: impl Into<String>) -> Self {
        Self {
            source,
            external_id: external_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub source: Source,
    pub last_contacted: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub name: String,
    pub sku: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub total: Option<f64>,
    pub tax: Option<f64>,
    pub vendor: Option<String>,
    pub shipping_method: Option<String>,
}

impl From<&LineItemRecord> for LineItem {
    fn from(item: &LineItemRecord) -> Self {
        Self {
            name: item.name.clone(),
            sku: item.sku.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total: item.total,
            tax: item.tax,
            vendor: item.vendor.clone(),
            shipping_method: item.shipping_method.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub customer_id: CustomerId,
    pub external_id: String,
    pub invoice_number: Option<String>,
    pub status: Option<String>,
    pub currency: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub amount_due: Option<f64>,
    pub total: Option<f64>,
    pub tax_total: Option<f64>,
    pub source: Source,
    pub line_items: Vec<LineItem>,
}

/// An order that could not be attached to any merged customer.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOrder {
    pub source: Source,
    pub external_id: String,
    pub customer_external_id: Option<String>,
}

/// Output of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciliation {
    pub customers: Vec<Customer>,
    pub orders: Vec<Order>,
    pub last_contacted: BTreeMap<CustomerId, DateTime<Utc>>,
    pub identities: HashMap<SourceRef, CustomerId>,
    pub skipped: Vec<SkippedOrder>,
    /// Customer records folded into an identity that was already seen.
    pub merged_records: usize,
}

impl Reconciliation {
    pub fn customer_for(&self, source: Source, external_id: &str) -> Option<&Customer> {
        let id = self.identities.get(&SourceRef::new(source, external_id))?;
        self.customers.iter().find(|c| c.id == *id)
    }

    pub fn orders_of(&self, id: CustomerId) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(move |o| o.customer_id == id)
    }

    pub fn line_item_count(&self) -> usize {
        self.orders.iter().map(|o| o.line_items.len()).sum()
    }
}

/// Both sources' data, fetched in full before anything is written.
#[derive(Debug, Clone)]
pub struct SyncInput {
    pub source_a: SourceBatch,
    pub source_b: SourceBatch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub customers: usize,
    pub orders: usize,
    pub line_items: usize,
    pub skipped_orders: usize,
    pub merged_records: usize,
    pub undated_customers: usize,
}

impl SyncReport {
    pub fn from_reconciliation(ledger: &Reconciliation) -> Self {
        Self {
            customers: ledger.customers.len(),
            orders: ledger.orders.len(),
            line_items: ledger.line_item_count(),
            skipped_orders: ledger.skipped.len(),
            merged_records: ledger.merged_records,
            undated_customers: ledger
                .customers
                .iter()
                .filter(|c| c.last_contacted.is_none())
                .count(),
        }
    }
}

/// Customer row read back from the ledger store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCustomer {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub source: String,
    pub synced_at: String,
    pub last_contacted: Option<DateTime<Utc>>,
    pub order_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InactiveCustomer {
    pub id: i64,
    pub name: String,
    pub last_contacted: Option<DateTime<Utc>>,
    /// `None` when the customer has never been contacted.
    pub days_since_contact: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub invoice_number: Option<String>,
    pub customer_name: String,
    pub total: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub customers: usize,
    pub orders: usize,
    pub line_items: usize,
}
