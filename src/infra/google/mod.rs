pub mod drive_client;
pub mod service_account;

pub use drive_client::GoogleDriveClient;
pub use service_account::ServiceAccountAuth;
