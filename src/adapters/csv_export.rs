use crate::core::dates::format_datetime;
use crate::domain::model::StoredCustomer;
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    id: i64,
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    source: &'a str,
    last_contacted: String,
    order_count: i64,
}

const HEADER: [&str; 7] = [
    "id",
    "name",
    "email",
    "phone",
    "source",
    "last_contacted",
    "order_count",
];

/// Writes the customer ledger as CSV, one row per customer. The header is
/// written even when there are no customers.
pub fn write_ledger_csv<W: Write>(customers: &[StoredCustomer], writer: W) -> Result<usize> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(HEADER)?;

    for customer in customers {
        csv_writer.serialize(LedgerRow {
            id: customer.id,
            name: &customer.name,
            email: customer.email.as_deref().unwrap_or(""),
            phone: customer.phone.as_deref().unwrap_or(""),
            source: &customer.source,
            last_contacted: customer
                .last_contacted
                .as_ref()
                .map(format_datetime)
                .unwrap_or_default(),
            order_count: customer.order_count,
        })?;
    }

    csv_writer.flush()?;
    Ok(customers.len())
}

pub fn export_ledger_csv<P: AsRef<Path>>(customers: &[StoredCustomer], path: P) -> Result<usize> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path.as_ref())?;
    let rows = write_ledger_csv(customers, file)?;
    tracing::info!("📁 Exported {} customers to {}", rows, path.as_ref().display());
    Ok(rows)
}
