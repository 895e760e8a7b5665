// pglock server - HTTP front end for lease-based locks stored in PostgreSQL

pub mod api; // API handlers and models
pub mod error; // Startup errors
pub mod metrics; // Prometheus exposition
pub mod model; // Configuration, state and response types
pub mod startup; // Application startup utilities

pub use error::ServerError;
pub use model::{AppState, Configuration, ErrorResult};
