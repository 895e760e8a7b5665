//! HTTP server setup.

use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};

use crate::{api, metrics, model::AppState};

/// Creates and binds the main HTTP server.
pub fn main_server(app_state: Arc<AppState>) -> Result<Server, std::io::Error> {
    let address = app_state.configuration.server_address();
    let port = app_state.configuration.server_port();
    let shutdown_timeout = app_state.configuration.shutdown_timeout().as_secs();
    let metrics_enabled = app_state.configuration.metrics_enabled();

    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::from(app_state.clone()))
            .service(api::v1::route::routes())
            .configure(|cfg| {
                if metrics_enabled {
                    cfg.service(metrics::route());
                }
            })
    })
    .shutdown_timeout(shutdown_timeout)
    .bind((address, port))?
    .run())
}
