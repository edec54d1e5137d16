pub mod totango_client;

pub use totango_client::TotangoClient;
