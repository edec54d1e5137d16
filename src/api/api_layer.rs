// HTTP surface for the ad studio: an axum router over the core services.
// Handlers stay thin; anything with rules lives in core.

pub mod account_routes;
pub mod api_error;
pub mod app_state;
pub mod generate_routes;
pub mod meta_routes;
pub mod server;

pub use app_state::AppState;
pub use server::{router, serve};
