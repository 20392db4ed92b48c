use crate::adapters::amount::Amount;
use crate::config::toml_config::BigCommerceConfig;
use crate::core::SourceClient;
use crate::domain::model::{
    ExternalCustomerRecord, ExternalOrderRecord, LineItemRecord, Source, SourceBatch,
};
use crate::utils::error::{Result, SyncError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BillingAddress {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    street_1: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    country: Option<String>,
}

impl BillingAddress {
    fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    fn postal_address(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.street_1, &self.city, &self.state, &self.zip, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Deserialize)]
struct BcOrder {
    id: u64,
    #[serde(default)]
    customer_id: u64,
    date_created: Option<String>,
    status: Option<String>,
    currency_code: Option<String>,
    total_inc_tax: Amount,
    total_tax: Option<Amount>,
    #[serde(default)]
    billing_address: BillingAddress,
}

#[derive(Debug, Deserialize)]
struct BcProduct {
    name: String,
    sku: Option<String>,
    quantity: Option<Amount>,
    base_price: Option<Amount>,
    total_inc_tax: Option<Amount>,
    total_tax: Option<Amount>,
}

/// Storefront source, read from the BigCommerce v2 orders API. Customers are
/// derived from each order's billing address.
pub struct BigCommerceClient {
    config: BigCommerceConfig,
    client: Client,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn amount(value: Option<&Amount>) -> Result<Option<f64>> {
    value.map(Amount::to_f64).transpose()
}

impl BigCommerceClient {
    pub fn new(config: BigCommerceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()?;
        Ok(Self { config, client })
    }

    fn orders_url(&self) -> String {
        format!(
            "{}/stores/{}/v2/orders",
            self.config.base_url.trim_end_matches('/'),
            self.config.store_hash
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Auth-Token", &self.config.api_token)
            .header("Accept", "application/json")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>> {
        let response = self.authorized(request).send().await?;
        let status = response.status();

        // BigCommerce 沒資料時回 204
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("BigCommerce responded {}: {}", status, text);
            return Err(SyncError::source_failure(
                Source::BigCommerce,
                format!("HTTP {}", status),
            ));
        }

        Ok(Some(response.json().await?))
    }

    async fn fetch_orders_page(&self, page: u32) -> Result<Vec<BcOrder>> {
        let per_page = self.config.per_page();
        tracing::debug!("Fetching BigCommerce orders page {}", page);

        let request = self
            .client
            .get(self.orders_url())
            .query(&[("page", page), ("limit", per_page)]);

        Ok(self.get_json(request).await?.unwrap_or_default())
    }

    async fn fetch_line_items(&self, order_id: u64) -> Result<Vec<LineItemRecord>> {
        let url = format!("{}/{}/products", self.orders_url(), order_id);
        let products: Vec<BcProduct> = self
            .get_json(self.client.get(url))
            .await?
            .unwrap_or_default();

        products
            .into_iter()
            .map(|p| -> Result<LineItemRecord> {
                Ok(LineItemRecord {
                    name: p.name,
                    sku: non_empty(p.sku),
                    quantity: amount(p.quantity.as_ref())?,
                    unit_price: amount(p.base_price.as_ref())?,
                    total: amount(p.total_inc_tax.as_ref())?,
                    tax: amount(p.total_tax.as_ref())?,
                    vendor: None,
                    shipping_method: None,
                })
            })
            .collect::<Result<Vec<_>>>()
    }

    fn to_records(
        order: BcOrder,
        line_items: Vec<LineItemRecord>,
    ) -> Result<(ExternalCustomerRecord, ExternalOrderRecord)> {
        let billing = order.billing_address;
        let name = billing.full_name();
        let customer_external_id = if order.customer_id != 0 {
            order.customer_id.to_string()
        } else {
            // 訪客結帳沒有 customer_id，用訂單編號當客戶識別
            order.id.to_string()
        };

        let total = order.total_inc_tax.to_f64()?;
        let customer = ExternalCustomerRecord {
            external_id: customer_external_id.clone(),
            name: if name.is_empty() {
                "Guest".to_string()
            } else {
                name
            },
            address: billing.postal_address(),
            email: non_empty(billing.email),
            phone: non_empty(billing.phone),
            source: Source::BigCommerce,
        };

        let record = ExternalOrderRecord {
            external_id: order.id.to_string(),
            invoice_number: Some(order.id.to_string()),
            status: order.status,
            currency: order.currency_code,
            created_at: order.date_created,
            due_date: None,
            customer_external_id: Some(customer_external_id),
            amount_due: Some(total),
            total: Some(total),
            tax_total: Some(amount(order.total_tax.as_ref())?.unwrap_or(0.0)),
            line_items,
            source: Source::BigCommerce,
        };

        Ok((customer, record))
    }
}

#[async_trait::async_trait]
impl SourceClient for BigCommerceClient {
    fn source(&self) -> Source {
        Source::BigCommerce
    }

    async fn fetch(&self) -> Result<SourceBatch> {
        let mut batch = SourceBatch::empty(Source::BigCommerce);
        let per_page = self.config.per_page() as usize;
        let mut page = 1;

        loop {
            let orders = self.fetch_orders_page(page).await?;
            let count = orders.len();
            tracing::debug!("Retrieved {} BigCommerce orders", count);

            for order in orders {
                let line_items = if self.config.fetch_line_items() {
                    self.fetch_line_items(order.id).await?
                } else {
                    Vec::new()
                };

                let order_id = order.id;
                let (customer, record) = Self::to_records(order, line_items).map_err(|e| {
                    SyncError::source_failure(
                        Source::BigCommerce,
                        format!("bad order {}: {}", order_id, e),
                    )
                })?;
                batch.customers.push(customer);
                batch.orders.push(record);
            }

            if count < per_page {
                break;
            }
            page += 1;
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config(base_url: String, per_page: u32, fetch_line_items: bool) -> BigCommerceConfig {
        BigCommerceConfig {
            base_url,
            store_hash: "abc123".to_string(),
            api_token: "bc-token".to_string(),
            per_page: Some(per_page),
            fetch_line_items: Some(fetch_line_items),
            timeout_seconds: Some(5),
            snapshot: None,
        }
    }

    fn order(id: u64, customer_id: u64, first: &str, last: &str, email: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "customer_id": customer_id,
            "date_created": "Sat, 15 Jun 2024 09:00:00 +0000",
            "status": "Shipped",
            "currency_code": "USD",
            "total_inc_tax": "108.2500",
            "total_tax": "8.2500",
            "billing_address": {
                "first_name": first,
                "last_name": last,
                "email": email,
                "phone": "",
                "street_1": "12 Elm St",
                "city": "Austin",
                "state": "Texas",
                "zip": "78701",
                "country": "United States"
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_maps_orders_to_customers() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/stores/abc123/v2/orders")
                .query_param("page", "1")
                .query_param("limit", "50")
                .header("X-Auth-Token", "bc-token");
            then.status(200).json_body(serde_json::json!([
                order(100, 7, "Jane", "Doe", "jane@x.com"),
                order(101, 0, "", "", "")
            ]));
        });

        let client = BigCommerceClient::new(config(server.base_url(), 50, false)).unwrap();
        let batch = client.fetch().await.unwrap();

        api_mock.assert();
        assert_eq!(batch.customers.len(), 2);
        assert_eq!(batch.customers[0].external_id, "7");
        assert_eq!(batch.customers[0].name, "Jane Doe");
        assert_eq!(batch.customers[0].phone, None);
        assert_eq!(
            batch.customers[0].address.as_deref(),
            Some("12 Elm St, Austin, Texas, 78701, United States")
        );
        assert_eq!(batch.customers[1].external_id, "101");
        assert_eq!(batch.customers[1].name, "Guest");
        assert_eq!(batch.customers[1].email, None);

        let first = &batch.orders[0];
        assert_eq!(first.invoice_number.as_deref(), Some("100"));
        assert_eq!(first.customer_external_id.as_deref(), Some("7"));
        assert_eq!(first.total, Some(108.25));
        assert_eq!(first.tax_total, Some(8.25));
        assert!(first.line_items.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_pages_until_short_page() {
        let server = MockServer::start();
        let page_one = server.mock(|when, then| {
            when.method(GET).path("/stores/abc123/v2/orders").query_param("page", "1");
            then.status(200).json_body(serde_json::json!([
                order(1, 1, "A", "One", "a@x.com"),
                order(2, 2, "B", "Two", "b@x.com")
            ]));
        });
        let page_two = server.mock(|when, then| {
            when.method(GET).path("/stores/abc123/v2/orders").query_param("page", "2");
            then.status(204);
        });

        let client = BigCommerceClient::new(config(server.base_url(), 2, false)).unwrap();
        let batch = client.fetch().await.unwrap();

        page_one.assert();
        page_two.assert();
        assert_eq!(batch.orders.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_line_items_when_enabled() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/stores/abc123/v2/orders");
            then.status(200)
                .json_body(serde_json::json!([order(100, 7, "Jane", "Doe", "jane@x.com")]));
        });
        let products = server.mock(|when, then| {
            when.method(GET).path("/stores/abc123/v2/orders/100/products");
            then.status(200).json_body(serde_json::json!([
                {"name": "Floor mats", "sku": "FM-1", "quantity": 2, "base_price": "40.0000",
                 "total_inc_tax": "86.6000", "total_tax": "6.6000"}
            ]));
        });

        let client = BigCommerceClient::new(config(server.base_url(), 50, true)).unwrap();
        let batch = client.fetch().await.unwrap();

        products.assert();
        let items = &batch.orders[0].line_items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sku.as_deref(), Some("FM-1"));
        assert_eq!(items[0].quantity, Some(2.0));
        assert_eq!(items[0].total, Some(86.6));
    }

    #[tokio::test]
    async fn test_server_error_is_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/stores/abc123/v2/orders");
            then.status(500).body("boom");
        });

        let client = BigCommerceClient::new(config(server.base_url(), 50, false)).unwrap();
        let err = client.fetch().await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::SourceError {
                origin: Source::BigCommerce,
                ..
            }
        ));
    }
}
