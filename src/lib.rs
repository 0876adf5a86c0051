pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;
