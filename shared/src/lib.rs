//! Process-wide wiring for the Cakewalk lambdas: configuration, the auth
//! gate, the S3 store and the shared state handed to every request.

pub mod auth;
pub mod config;
pub mod s3_store;
pub mod state;

pub use config::{Config, ConfigError, StoreBackend};
pub use s3_store::S3Store;
pub use state::AppState;
