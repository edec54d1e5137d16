pub mod shopify_client;
pub mod squarespace_client;

pub use shopify_client::ShopifyClient;
pub use squarespace_client::SquarespaceClient;
