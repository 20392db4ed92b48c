use crate::adapters::amount::Amount;
use crate::config::toml_config::WaveConfig;
use crate::core::SourceClient;
use crate::domain::model::{
    ExternalCustomerRecord, ExternalOrderRecord, LineItemRecord, Source, SourceBatch,
};
use crate::utils::error::{Result, SyncError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const INVOICES_QUERY: &str = r#"
query FetchInvoices($businessId: ID!, $page: Int!, $pageSize: Int!) {
  business(id: $businessId) {
    customers {
      edges { node { id name email phone } }
    }
    invoices(page: $page, pageSize: $pageSize) {
      pageInfo { currentPage totalPages }
      edges {
        node {
          id
          invoiceNumber
          status
          currency { code }
          createdAt
          dueDate
          customer { id name }
          amountDue { value }
          total { value }
          taxTotal { value }
          items {
            product { name }
            quantity
            price
            total { value }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    business: Option<Business>,
}

#[derive(Debug, Deserialize)]
struct Business {
    customers: Connection<WaveCustomer>,
    invoices: InvoiceConnection,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceConnection {
    page_info: Option<PageInfo>,
    edges: Vec<Edge<WaveInvoice>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    current_page: u32,
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct WaveCustomer {
    id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Money {
    value: Amount,
}

#[derive(Debug, Deserialize)]
struct Currency {
    code: String,
}

#[derive(Debug, Deserialize)]
struct CustomerRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Product {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaveItem {
    product: Option<Product>,
    quantity: Option<Amount>,
    price: Option<Amount>,
    total: Option<Money>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaveInvoice {
    id: String,
    invoice_number: Option<String>,
    status: Option<String>,
    currency: Option<Currency>,
    created_at: Option<String>,
    due_date: Option<String>,
    customer: Option<CustomerRef>,
    amount_due: Money,
    total: Money,
    tax_total: Option<Money>,
    #[serde(default)]
    items: Vec<WaveItem>,
}

/// Invoicing source, read through Wave's public GraphQL API.
pub struct WaveClient {
    config: WaveConfig,
    client: Client,
}

impl WaveClient {
    pub fn new(config: WaveConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()?;
        Ok(Self { config, client })
    }

    async fn fetch_page(&self, page: u32) -> Result<Business> {
        let body = serde_json::json!({
            "query": INVOICES_QUERY,
            "variables": {
                "businessId": self.config.business_id,
                "page": page,
                "pageSize": self.config.page_size(),
            }
        });

        tracing::debug!("Requesting Wave invoices page {}", page);
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("Wave responded {}: {}", status, text);
            return Err(SyncError::source_failure(
                Source::Wave,
                format!("HTTP {}", status),
            ));
        }

        let payload: GraphQlResponse = response.json().await?;
        if let Some(errors) = payload.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(SyncError::source_failure(
                Source::Wave,
                format!("GraphQL errors: {}", messages.join("; ")),
            ));
        }

        payload
            .data
            .and_then(|d| d.business)
            .ok_or_else(|| SyncError::source_failure(Source::Wave, "response has no business data"))
    }
}

fn to_customer(node: WaveCustomer) -> ExternalCustomerRecord {
    ExternalCustomerRecord {
        external_id: node.id,
        name: node.name,
        email: node.email,
        phone: node.phone,
        address: None,
        source: Source::Wave,
    }
}

fn to_order(inv: WaveInvoice) -> Result<ExternalOrderRecord> {
    let line_items = inv
        .items
        .into_iter()
        .map(|item| -> Result<LineItemRecord> {
            Ok(LineItemRecord {
                name: item
                    .product
                    .and_then(|p| p.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
                sku: None,
                quantity: item.quantity.as_ref().map(Amount::to_f64).transpose()?,
                unit_price: item.price.as_ref().map(Amount::to_f64).transpose()?,
                total: item.total.as_ref().map(|m| m.value.to_f64()).transpose()?,
                tax: None,
                vendor: None,
                shipping_method: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExternalOrderRecord {
        invoice_number: inv.invoice_number,
        status: inv.status,
        currency: inv.currency.map(|c| c.code),
        created_at: inv.created_at,
        due_date: inv.due_date,
        customer_external_id: inv.customer.map(|c| c.id),
        amount_due: Some(inv.amount_due.value.to_f64()?),
        total: Some(inv.total.value.to_f64()?),
        tax_total: Some(
            inv.tax_total
                .map(|m| m.value.to_f64())
                .transpose()?
                .unwrap_or(0.0),
        ),
        line_items,
        source: Source::Wave,
        external_id: inv.id,
    })
}

#[async_trait::async_trait]
impl SourceClient for WaveClient {
    fn source(&self) -> Source {
        Source::Wave
    }

    async fn fetch(&self) -> Result<SourceBatch> {
        let mut batch = SourceBatch::empty(Source::Wave);
        let mut page = 1;

        loop {
            let business = self.fetch_page(page).await?;

            // 客戶清單每頁都一樣，只取第一頁
            if page == 1 {
                batch.customers = business
                    .customers
                    .edges
                    .into_iter()
                    .map(|e| to_customer(e.node))
                    .collect();
            }

            let invoice_count = business.invoices.edges.len();
            for edge in business.invoices.edges {
                batch.orders.push(to_order(edge.node).map_err(|e| {
                    SyncError::source_failure(Source::Wave, format!("bad invoice: {}", e))
                })?);
            }
            tracing::debug!("Wave page {}: {} invoices", page, invoice_count);

            // 以自己的頁碼判斷，伺服器回報的 currentPage 不可靠
            match business.invoices.page_info {
                Some(info) if page < info.total_pages => page += 1,
                _ => break,
            }
        }

        Ok(batch)
    }
}
