use crate::core::dates::{format_datetime, parse_datetime};
use crate::core::LedgerStore;
use crate::domain::model::{
    InactiveCustomer, OrderSummary, Reconciliation, StoreSummary, StoredCustomer,
};
use crate::utils::error::{Result, SyncError};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    id              INTEGER PRIMARY KEY,
    external_id     TEXT NOT NULL,
    name            TEXT NOT NULL,
    email           TEXT,
    phone           TEXT,
    address         TEXT,
    source          TEXT NOT NULL,
    synced_at       TEXT NOT NULL,
    last_contacted  TEXT
);
CREATE INDEX IF NOT EXISTS idx_customers_email ON customers(email);

CREATE TABLE IF NOT EXISTS orders (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id     INTEGER NOT NULL REFERENCES customers(id),
    source          TEXT NOT NULL,
    external_id     TEXT NOT NULL,
    invoice_number  TEXT,
    status          TEXT,
    currency        TEXT,
    created_at      TEXT,
    due_date        TEXT,
    amount_due      REAL,
    total           REAL,
    tax_total       REAL
);
CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id);

CREATE TABLE IF NOT EXISTS line_items (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id        INTEGER NOT NULL REFERENCES orders(id),
    name            TEXT NOT NULL,
    sku             TEXT,
    quantity        REAL,
    unit_price      REAL,
    tax             REAL,
    total           REAL,
    vendor          TEXT,
    shipping_method TEXT
);
"#;

/// SQLite-backed customer ledger. The connection is handed in explicitly;
/// nothing here opens or closes connections behind the caller's back.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SyncError::ProcessingError {
            message: "ledger connection mutex poisoned".to_string(),
        })
    }

    /// Delete-all then insert, inside one transaction. Any failure drops the
    /// transaction, which rolls back to the previous ledger.
    pub fn write_ledger(
        &self,
        ledger: &Reconciliation,
        synced_at: DateTime<Utc>,
    ) -> Result<StoreSummary> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let synced_at = format_datetime(&synced_at);
        let mut summary = StoreSummary::default();

        tx.execute("DELETE FROM line_items", [])?;
        tx.execute("DELETE FROM orders", [])?;
        tx.execute("DELETE FROM customers", [])?;

        {
            let mut insert_customer = tx.prepare(
                "INSERT INTO customers
                     (id, external_id, name, email, phone, address, source, synced_at, last_contacted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for customer in &ledger.customers {
                insert_customer.execute(params![
                    customer.id.0,
                    customer.external_id,
                    customer.name,
                    customer.email,
                    customer.phone,
                    customer.address,
                    customer.source.as_str(),
                    synced_at,
                    customer.last_contacted.as_ref().map(format_datetime),
                ])?;
                summary.customers += 1;
            }

            let mut insert_order = tx.prepare(
                "INSERT INTO orders
                     (customer_id, source, external_id, invoice_number, status, currency,
                      created_at, due_date, amount_due, total, tax_total)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            let mut insert_item = tx.prepare(
                "INSERT INTO line_items
                     (order_id, name, sku, quantity, unit_price, tax, total, vendor, shipping_method)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for order in &ledger.orders {
                insert_order.execute(params![
                    order.customer_id.0,
                    order.source.as_str(),
                    order.external_id,
                    order.invoice_number,
                    order.status,
                    order.currency,
                    order.created_at.as_ref().map(format_datetime),
                    order.due_date.as_ref().map(format_datetime),
                    order.amount_due,
                    order.total,
                    order.tax_total,
                ])?;
                let order_id = tx.last_insert_rowid();
                summary.orders += 1;

                for item in &order.line_items {
                    insert_item.execute(params![
                        order_id,
                        item.name,
                        item.sku,
                        item.quantity,
                        item.unit_price,
                        item.tax,
                        item.total,
                        item.vendor,
                        item.shipping_method,
                    ])?;
                    summary.line_items += 1;
                }
            }
        }

        tx.commit()?;
        tracing::info!(
            "💾 Ledger replaced: {} customers, {} orders, {} line items",
            summary.customers,
            summary.orders,
            summary.line_items
        );
        Ok(summary)
    }

    pub fn read_customers(&self) -> Result<Vec<StoredCustomer>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.external_id, c.name, c.email, c.phone, c.address, c.source,
                    c.synced_at, c.last_contacted,
                    (SELECT COUNT(*) FROM orders o WHERE o.customer_id = c.id)
             FROM customers c
             ORDER BY c.id",
        )?;

        let rows = stmt.query_map([], |row| {
            let last_contacted: Option<String> = row.get(8)?;
            Ok(StoredCustomer {
                id: row.get(0)?,
                external_id: row.get(1)?,
                name: row.get(2)?,
                email: row.get(3)?,
                phone: row.get(4)?,
                address: row.get(5)?,
                source: row.get(6)?,
                synced_at: row.get(7)?,
                last_contacted: last_contacted.as_deref().and_then(parse_datetime),
                order_count: row.get(9)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn read_inactive(&self, as_of: DateTime<Utc>, days: i64) -> Result<Vec<InactiveCustomer>> {
        let cutoff = Duration::try_days(days)
            .filter(|_| days >= 0)
            .and_then(|window| as_of.checked_sub_signed(window))
            .ok_or_else(|| SyncError::InvalidConfigValueError {
                field: "days".to_string(),
                value: days.to_string(),
                reason: "inactivity window must be a non-negative number of days within the calendar range".to_string(),
            })?;
        let cutoff = format_datetime(&cutoff);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, last_contacted
             FROM customers
             WHERE last_contacted IS NULL OR last_contacted < ?1
             ORDER BY last_contacted IS NOT NULL, last_contacted, id",
        )?;

        let rows = stmt.query_map(params![cutoff], |row| {
            let last_contacted: Option<String> = row.get(2)?;
            let last_contacted = last_contacted.as_deref().and_then(parse_datetime);
            Ok(InactiveCustomer {
                id: row.get(0)?,
                name: row.get(1)?,
                days_since_contact: last_contacted.map(|ts| (as_of - ts).num_days()),
                last_contacted,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn read_latest_orders(&self, limit: usize) -> Result<Vec<OrderSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT o.invoice_number, c.name, o.total, o.created_at, o.source
             FROM orders o
             JOIN customers c ON c.id = o.customer_id
             ORDER BY o.created_at IS NULL, o.created_at DESC, o.id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let created_at: Option<String> = row.get(3)?;
            Ok(OrderSummary {
                invoice_number: row.get(0)?,
                customer_name: row.get(1)?,
                total: row.get(2)?,
                created_at: created_at.as_deref().and_then(parse_datetime),
                source: row.get(4)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl LedgerStore for SqliteStore {
    async fn replace_all(&self, ledger: &Reconciliation) -> Result<StoreSummary> {
        self.write_ledger(ledger, Utc::now())
    }

    async fn customers(&self) -> Result<Vec<StoredCustomer>> {
        self.read_customers()
    }

    async fn inactive_customers(
        &self,
        as_of: DateTime<Utc>,
        days: i64,
    ) -> Result<Vec<InactiveCustomer>> {
        self.read_inactive(as_of, days)
    }

    async fn latest_orders(&self, limit: usize) -> Result<Vec<OrderSummary>> {
        self.read_latest_orders(limit)
    }
}
