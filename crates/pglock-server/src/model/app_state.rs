//! Application state shared across handlers

use std::sync::Arc;

use pglock_core::LeaseManager;

use super::config::Configuration;

pub struct AppState {
    pub configuration: Configuration,
    pub lease_manager: Arc<dyn LeaseManager>,
}

impl AppState {
    pub fn new(configuration: Configuration, lease_manager: Arc<dyn LeaseManager>) -> Self {
        Self {
            configuration,
            lease_manager,
        }
    }
}
