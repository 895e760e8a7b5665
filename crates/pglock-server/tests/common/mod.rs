//! Common test utilities

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pglock_core::{CoordinatorConfig, LockCoordinator, ManualClock};
use pglock_persistence::MemoryLeaseStore;
use pglock_server::model::{AppState, Configuration};

/// Memory-backed server state with a manually driven clock
pub struct TestContext {
    pub app_state: Arc<AppState>,
    pub store: MemoryLeaseStore,
    pub clock: ManualClock,
}

impl TestContext {
    pub fn new(lease_ttl: Duration) -> Self {
        let store = MemoryLeaseStore::new();
        let clock = ManualClock::new(start_time());
        let coordinator = LockCoordinator::new(
            Arc::new(store.clone()),
            CoordinatorConfig::default().with_lease_ttl(lease_ttl),
        )
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

        let app_state = Arc::new(AppState::new(
            Configuration::default(),
            Arc::new(coordinator),
        ));

        Self {
            app_state,
            store,
            clock,
        }
    }

    pub fn advance(&self, secs: i64) {
        self.clock.advance(chrono::Duration::seconds(secs));
    }
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Build the v1 API test service around an `Arc<AppState>`
macro_rules! init_app {
    ($app_state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::from($app_state))
                .service(pglock_server::api::v1::route::routes()),
        )
        .await
    };
}
