// HTTP API handlers and routes

pub mod v1;
