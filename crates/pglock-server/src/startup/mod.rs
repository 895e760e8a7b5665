//! Application startup utilities module.

mod database;
mod http;
mod logging;
mod store;

pub use database::{connect, migrate};
pub use http::main_server;
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use store::lease_manager;
