//! # Bondrisk Server
//!
//! REST server for the bondrisk risk service.
//!
//! [`Server`] owns everything that runs next to the router: the CORS policy
//! from [`ServerConfig::cors_origins`], the background curve refresh when a
//! [`CurveSource`] is attached, and graceful shutdown on Ctrl-C.
//!
//! ```ignore
//! use bondrisk_server::Server;
//!
//! Server::new(config, service)
//!     .with_curve_source(source)
//!     .start()
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod handlers;
pub mod refresh;
pub mod routes;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use bondrisk_engine::RiskService;
use bondrisk_traits::CurveSource;

pub use config::{ConfigError, ServerConfig};
pub use refresh::spawn_curve_refresh;

/// HTTP front end for a [`RiskService`].
pub struct Server {
    config: ServerConfig,
    service: Arc<RiskService>,
    curve_source: Option<Arc<dyn CurveSource>>,
}

impl Server {
    /// Serve `service` with `config`. No curve refresh until a source is attached.
    pub fn new(config: ServerConfig, service: Arc<RiskService>) -> Self {
        Self {
            config,
            service,
            curve_source: None,
        }
    }

    /// Poll `source` for the live curve while the server runs.
    pub fn with_curve_source(mut self, source: Arc<dyn CurveSource>) -> Self {
        self.curve_source = Some(source);
        self
    }

    /// Routes with request tracing and the configured CORS policy.
    pub fn router(&self) -> Router {
        routes::create_router(self.service.clone())
            .layer(TraceLayer::new_for_http())
            .layer(self.cors_layer())
    }

    /// Any origin when `cors_origins` is empty or contains `*`, otherwise
    /// only the listed ones.
    fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        let origins = &self.config.cors_origins;
        if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
            return layer.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }

    /// Start the curve refresh task, if a source is attached.
    pub fn spawn_refresh(&self) -> Option<JoinHandle<()>> {
        self.curve_source
            .as_ref()
            .map(|source| spawn_curve_refresh(self.service.clone(), source.clone()))
    }

    /// Bind, serve until Ctrl-C, then stop the refresh task.
    pub async fn start(&self) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        info!(addr = %listener.local_addr()?, "bondrisk server listening");

        let refresh = self.spawn_refresh();
        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(handle) = refresh {
            handle.abort();
        }
        info!("bondrisk server stopped");
        served
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
