//! HTTP API integration tests

mod lock_api_test;
