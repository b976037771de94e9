pub mod rpc;

use crate::core::{
    config::{PrometheusConfig, RPCConfig},
    error::{EngineError, ErrorKind},
    storage::Storage,
    Engine,
};
use actix_web::{
    dev::ServerHandle,
    error::Error,
    get,
    http::StatusCode,
    web::{self, Data},
    App, HttpResponse, HttpServer, Responder, ResponseError,
};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use anyhow::Context;
use commission_common::config::VERSION;
use log::{error, info, warn};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

pub type SharedRpcServer = Arc<RpcServer>;

pub struct RpcServer {
    handle: Mutex<Option<ServerHandle>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Missing or invalid bearer token")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn error_name(&self) -> String {
        match self {
            ApiError::Engine(e) => e.kind().to_string(),
            ApiError::Unauthorized => "unauthorized".to_owned(),
            ApiError::BadRequest(_) => ErrorKind::Validation.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Engine(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::DataIntegrity => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::ExternalDependency => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        HttpResponse::build(status).json(json!({
            "error": self.error_name(),
            "message": self.to_string(),
        }))
    }
}

/// Bearer token guarding the admin and scheduler endpoints
pub struct AdminAuth {
    token: Option<String>,
}

impl AdminAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|token| !token.is_empty()),
        }
    }

    /// Without a configured token every caller is accepted
    pub fn authorize(&self, credentials: Option<&BearerAuth>) -> Result<(), ApiError> {
        let Some(expected) = &self.token else {
            return Ok(());
        };
        match credentials {
            Some(credentials) if token_matches(credentials.token(), expected) => Ok(()),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

// Constant-time comparison of the bearer token
fn token_matches(given: &str, expected: &str) -> bool {
    bool::from(given.as_bytes().ct_eq(expected.as_bytes()))
}

impl RpcServer {
    pub async fn new<S: Storage>(
        engine: Arc<Engine<S>>,
        config: RPCConfig,
        prometheus: PrometheusConfig,
    ) -> Result<SharedRpcServer, anyhow::Error> {
        let server = Arc::new(Self {
            handle: Mutex::new(None),
        });

        let prometheus = if prometheus.enable {
            let (recorder, _) = PrometheusBuilder::new()
                .build()
                .context("Failed to create Prometheus handler")?;

            let handle = recorder.handle();
            metrics::set_global_recorder(Box::new(recorder))
                .context("Failed to set global recorder for Prometheus")?;

            if log::log_enabled!(log::Level::Info) {
                info!("Prometheus metrics enabled on route: {}", prometheus.route);
            }
            Some((prometheus.route, handle))
        } else {
            None
        };

        if config.bind_address.starts_with("0.0.0.0") {
            warn!("RPC server is bound to 0.0.0.0 (all interfaces)");
            if config.admin_token.is_none() {
                warn!("Payout release, pool distribution and withdrawal approval are reachable WITHOUT authentication");
                warn!("Set --admin-token or bind to 127.0.0.1");
            }
        }

        if log::log_enabled!(log::Level::Info) {
            info!("Starting RPC server on {}", config.bind_address);
        }

        let auth = Data::new(AdminAuth::new(config.admin_token.clone()));
        let engine = Data::from(engine);
        let http_server = HttpServer::new(move || {
            let mut app = App::new()
                .app_data(engine.clone())
                .app_data(auth.clone())
                .app_data(Data::new(
                    prometheus.as_ref().map(|(_, handle)| handle.clone()),
                ))
                .configure(rpc::configure::<S>)
                .service(index);

            if let Some((route, _)) = &prometheus {
                app = app.route(route, web::get().to(prometheus_metrics));
            }
            app
        })
        .disable_signals()
        .bind(&config.bind_address)
        .with_context(|| format!("Failed to bind RPC server on {}", config.bind_address))?
        .workers(config.threads)
        .run();

        {
            // save the server handle to be able to stop it later
            let handle = http_server.handle();
            let mut lock = server.handle.lock().await;
            *lock = Some(handle);
        }
        tokio::spawn(async move {
            if let Err(e) = http_server.await {
                error!("RPC server exited with error: {}", e);
            }
        });

        Ok(server)
    }

    pub async fn stop(&self) {
        info!("Stopping RPC Server...");
        let mut handle = self.handle.lock().await;
        if let Some(handle) = handle.take() {
            handle.stop(false).await;
            info!("RPC Server is now stopped!");
        } else {
            warn!("RPC Server is not running!");
        }
    }
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body(format!("Commission engine running on: {}", VERSION))
}

async fn prometheus_metrics(handle: Data<Option<PrometheusHandle>>) -> Result<HttpResponse, Error> {
    Ok(match handle.as_ref() {
        Some(handle) => {
            let metrics = handle.render();
            HttpResponse::Ok()
                .content_type("text/plain; version=0.0.4")
                .body(metrics)
        }
        None => HttpResponse::NotFound().body("Prometheus metrics are not enabled"),
    })
}
