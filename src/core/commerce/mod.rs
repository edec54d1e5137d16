pub mod product_sync;

pub use product_sync::{
    describe_products, migrate_to_shopify, read_rows, CommerceError, RowBatch, ShopifyApi, ShopifyConfig,
    ShopifyProductEnvelope, SquarespaceApi, SquarespaceConfig, SyncSummary,
};
