// Product catalogue syncing from CSV exports.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::ai::{AiError, AiProvider, AiService};
use crate::core::config::{require_all, ConfigError, EnvSource};

pub const SHOPIFY_API_VERSION: &str = "2023-07";

#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("Invalid row: {0}")]
    InvalidRow(String),
    #[error("Store API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Store request failed: {0}")]
    Http(String),
    #[error(transparent)]
    Ai(#[from] AiError),
}

pub type Row = HashMap<String, String>;

/// Rows keyed by header. Short rows lack the trailing columns, extra
/// fields are dropped and a record that cannot be decoded is logged and
/// counted instead of failing the file.
#[derive(Debug, Default)]
pub struct RowBatch {
    pub rows: Vec<Row>,
    pub unreadable: usize,
}

pub fn read_rows(path: &Path) -> Result<RowBatch, CommerceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| CommerceError::Csv(e.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|e| CommerceError::Csv(e.to_string()))?
        .clone();

    let mut batch = RowBatch::default();
    for (index, record) in reader.records().enumerate() {
        match record {
            Ok(record) => batch.rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!(row = index + 1, error = %e, "Skipping unreadable CSV record");
                batch.unreadable += 1;
            }
        }
    }
    Ok(batch)
}

/// First column among `keys` with a non-empty value.
fn first_present<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .map(|v| v.as_str())
        .find(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopifyVariant {
    pub price: String,
    pub sku: String,
    pub inventory_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopifyProduct {
    pub title: String,
    pub body_html: String,
    pub vendor: String,
    pub variants: Vec<ShopifyVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopifyProductEnvelope {
    pub product: ShopifyProduct,
}

pub fn shopify_product(row: &Row) -> Result<ShopifyProductEnvelope, CommerceError> {
    let quantity = match first_present(row, &["Quantity"]) {
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            CommerceError::InvalidRow(format!("Quantity '{raw}' is not an integer"))
        })?,
        None => 0,
    };

    Ok(ShopifyProductEnvelope {
        product: ShopifyProduct {
            title: first_present(row, &["Name", "Item Name"])
                .unwrap_or("Untitled")
                .to_string(),
            body_html: first_present(row, &["Body", "Description"])
                .unwrap_or_default()
                .to_string(),
            vendor: first_present(row, &["Vendor"]).unwrap_or_default().to_string(),
            variants: vec![ShopifyVariant {
                price: first_present(row, &["Variant Price", "Price"])
                    .unwrap_or("0")
                    .to_string(),
                sku: first_present(row, &["Variant SKU", "SKU"])
                    .unwrap_or_default()
                    .to_string(),
                inventory_quantity: quantity,
            }],
        },
    })
}

#[async_trait]
pub trait ShopifyApi: Send + Sync {
    async fn create_product(&self, product: &ShopifyProductEnvelope) -> Result<(), CommerceError>;
}

#[async_trait]
pub trait SquarespaceApi: Send + Sync {
    async fn update_description(&self, product_id: &str, description: &str) -> Result<(), CommerceError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncSummary {
    /// Records that never made it past the CSV reader count as failures.
    pub fn with_unreadable(mut self, unreadable: usize) -> Self {
        self.processed += unreadable;
        self.failed += unreadable;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopifyConfig {
    pub store: String,
    pub api_key: String,
    pub api_password: String,
}

impl ShopifyConfig {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let mut values =
            require_all(env, &["SHOPIFY_STORE", "SHOPIFY_API_KEY", "SHOPIFY_API_PASSWORD"])?
                .into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            store: next(),
            api_key: next(),
            api_password: next(),
        })
    }

    pub fn products_url(&self) -> String {
        format!(
            "https://{}/admin/api/{SHOPIFY_API_VERSION}/products.json",
            self.store
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquarespaceConfig {
    pub api_key: String,
    pub site_id: String,
    pub openai_key: String,
}

impl SquarespaceConfig {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let mut values = require_all(
            env,
            &["SQUARESPACE_API_KEY", "SQUARESPACE_SITE_ID", "OPENAI_API_KEY"],
        )?
        .into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            api_key: next(),
            site_id: next(),
            openai_key: next(),
        })
    }
}

pub async fn migrate_to_shopify(api: &dyn ShopifyApi, rows: &[Row]) -> SyncSummary {
    let mut summary = SyncSummary::default();
    for (index, row) in rows.iter().enumerate() {
        summary.processed += 1;
        let product = match shopify_product(row) {
            Ok(product) => product,
            Err(e) => {
                tracing::warn!(row = index + 1, error = %e, "Skipping product row");
                summary.failed += 1;
                continue;
            }
        };
        let title = product.product.title.clone();
        match api.create_product(&product).await {
            Ok(()) => {
                tracing::info!(title = %title, "Uploaded product");
                summary.succeeded += 1;
            }
            Err(e) => {
                tracing::error!(title = %title, error = %e, "Failed to upload product");
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Writes an AI description for every row that names a product id.
pub async fn describe_products<P: AiProvider>(
    ai: &AiService<P>,
    api: &dyn SquarespaceApi,
    rows: &[Row],
) -> SyncSummary {
    let mut summary = SyncSummary::default();
    for row in rows {
        summary.processed += 1;
        let (Some(product_id), Some(name)) = (
            first_present(row, &["id", "ID"]),
            first_present(row, &["name", "Name"]),
        ) else {
            tracing::warn!("Skipping row with missing ID or name");
            summary.skipped += 1;
            continue;
        };

        let description = match ai.describe_product(name).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(product_id, error = %e, "Description generation failed");
                summary.failed += 1;
                continue;
            }
        };
        match api.update_description(product_id, &description).await {
            Ok(()) => {
                tracing::info!(product_id, "Updated product description");
                summary.succeeded += 1;
            }
            Err(e) => {
                tracing::error!(product_id, error = %e, "Failed to update product");
                summary.failed += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::ai_service::testing::ScriptedAi;
    use std::io::Write;
    use std::sync::Mutex;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[derive(Default)]
    struct RecordingShop {
        products: Mutex<Vec<ShopifyProductEnvelope>>,
        updates: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ShopifyApi for RecordingShop {
        async fn create_product(&self, product: &ShopifyProductEnvelope) -> Result<(), CommerceError> {
            if product.product.title == "Reject me" {
                return Err(CommerceError::Api {
                    status: 422,
                    body: "title taken".to_string(),
                });
            }
            self.products.lock().unwrap().push(product.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl SquarespaceApi for RecordingShop {
        async fn update_description(&self, product_id: &str, description: &str) -> Result<(), CommerceError> {
            self.updates
                .lock()
                .unwrap()
                .push((product_id.to_string(), description.to_string()));
            Ok(())
        }
    }

    #[test]
    fn product_fields_fall_back_through_column_names() {
        let product = shopify_product(&row(&[
            ("Item Name", "Mug"),
            ("Body", ""),
            ("Description", "Ceramic"),
            ("Price", "12.50"),
            ("SKU", "MUG-1"),
            ("Quantity", " 7 "),
        ]))
        .unwrap()
        .product;

        assert_eq!(product.title, "Mug");
        assert_eq!(product.body_html, "Ceramic");
        assert_eq!(product.vendor, "");
        assert_eq!(product.variants[0].price, "12.50");
        assert_eq!(product.variants[0].sku, "MUG-1");
        assert_eq!(product.variants[0].inventory_quantity, 7);
    }

    #[test]
    fn empty_row_gets_defaults() {
        let product = shopify_product(&Row::new()).unwrap().product;
        assert_eq!(product.title, "Untitled");
        assert_eq!(product.variants[0].price, "0");
        assert_eq!(product.variants[0].inventory_quantity, 0);
    }

    #[test]
    fn non_numeric_quantity_is_a_row_error() {
        assert!(matches!(
            shopify_product(&row(&[("Quantity", "lots")])),
            Err(CommerceError::InvalidRow(_))
        ));
    }

    #[test]
    fn csv_rows_are_read_by_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Name,Price\nLamp,30\nDesk,120").unwrap();
        let batch = read_rows(file.path()).unwrap();
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.rows[1]["Name"], "Desk");
        assert_eq!(batch.unreadable, 0);
    }

    #[test]
    fn short_row_does_not_stop_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id,title,price\n1,Mug,9.99\n2,Cap\n3,Tee,19.00,extra\n").unwrap();
        let batch = read_rows(file.path()).unwrap();

        assert_eq!(batch.unreadable, 0);
        assert_eq!(batch.rows.len(), 3);
        assert_eq!(batch.rows[1]["title"], "Cap");
        assert!(!batch.rows[1].contains_key("price"));
        assert_eq!(batch.rows[2]["price"], "19.00");
        assert_eq!(batch.rows[2].len(), 3);
    }

    #[tokio::test]
    async fn undecodable_record_is_counted_as_failed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Name,Price\nLamp,30\n\xff\xfe,1\nDesk,120\n").unwrap();
        let batch = read_rows(file.path()).unwrap();
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.unreadable, 1);

        let shop = RecordingShop::default();
        let summary = migrate_to_shopify(&shop, &batch.rows)
            .await
            .with_unreadable(batch.unreadable);
        assert_eq!(
            summary,
            SyncSummary {
                processed: 3,
                succeeded: 2,
                skipped: 0,
                failed: 1
            }
        );
        let titles: Vec<_> = shop
            .products
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.product.title.clone())
            .collect();
        assert_eq!(titles, vec!["Lamp", "Desk"]);
    }

    #[tokio::test]
    async fn migration_continues_after_failures() {
        let shop = RecordingShop::default();
        let rows = vec![
            row(&[("Name", "Lamp")]),
            row(&[("Name", "Reject me")]),
            row(&[("Name", "Bad qty"), ("Quantity", "x")]),
            row(&[("Name", "Desk")]),
        ];
        let summary = migrate_to_shopify(&shop, &rows).await;
        assert_eq!(
            summary,
            SyncSummary {
                processed: 4,
                succeeded: 2,
                skipped: 0,
                failed: 2
            }
        );
    }

    #[tokio::test]
    async fn rows_without_id_are_skipped() {
        let shop = RecordingShop::default();
        let ai = AiService::new(ScriptedAi::replying(" A lovely lamp. "));
        let rows = vec![
            row(&[("name", "Lamp")]),
            row(&[("ID", "p-2"), ("Name", "Desk")]),
            row(&[("id", "p-3"), ("name", "")]),
        ];

        let summary = describe_products(&ai, &shop, &rows).await;
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.succeeded, 1);
        let updates = shop.updates.lock().unwrap();
        assert_eq!(*updates, vec![("p-2".to_string(), "A lovely lamp.".to_string())]);
    }

    #[test]
    fn shopify_url_targets_admin_api() {
        let config = ShopifyConfig {
            store: "clipopera.myshopify.com".to_string(),
            api_key: "k".to_string(),
            api_password: "p".to_string(),
        };
        assert_eq!(
            config.products_url(),
            "https://clipopera.myshopify.com/admin/api/2023-07/products.json"
        );
    }
}
