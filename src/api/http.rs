//! HTTP API Server
//!
//! REST API for cars plus health and routing statistics.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router as AxumRouter,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::cars::{Car, CarService};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::router::Router;

/// Shared application state
pub struct AppState {
    /// Car storage over the broadcast router
    pub cars: CarService,
}

/// HTTP API server
pub struct HttpServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ApiConfig, router: Arc<Router>) -> Self {
        let state = Arc::new(AppState {
            cars: CarService::new(router),
        });

        Self { config, state }
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Create the router
    pub fn create_router(state: Arc<AppState>) -> AxumRouter {
        AxumRouter::new()
            .route("/cars", get(handle_list_cars).post(handle_create_car))
            .route(
                "/cars/:id",
                get(handle_get_car)
                    .put(handle_update_car)
                    .delete(handle_delete_car),
            )
            .route("/health", get(handle_health))
            .route("/stats", get(handle_stats))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP server, stopping when `shutdown` resolves
    pub async fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.config.enabled {
            tracing::info!("HTTP API disabled");
            return Ok(());
        }

        let app = Self::create_router(Arc::clone(&self.state));

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.config.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}

// ============ Response Types ============

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub nodes: usize,
}

fn respond_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn error_status(err: &Error) -> StatusCode {
    match err {
        e if e.is_no_rows() => StatusCode::NOT_FOUND,
        e if e.is_connectivity() => StatusCode::SERVICE_UNAVAILABLE,
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn parse_id(raw: &str) -> std::result::Result<i64, Response> {
    raw.parse::<i64>()
        .map_err(|e| respond_error(StatusCode::BAD_REQUEST, format!("invalid car id '{}': {}", raw, e)))
}

// ============ Handlers ============

async fn handle_list_cars(State(state): State<Arc<AppState>>) -> Response {
    match state.cars.list().await {
        Ok(cars) => Json(cars).into_response(),
        Err(e) => {
            tracing::error!("Failed to list cars: {}", e);
            respond_error(error_status(&e), e.to_string())
        }
    }
}

async fn handle_get_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.cars.get(id).await {
        Ok(car) => Json(car).into_response(),
        Err(e) => respond_error(error_status(&e), e.to_string()),
    }
}

async fn handle_create_car(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Car>, JsonRejection>,
) -> Response {
    let Json(car) = match body {
        Ok(body) => body,
        Err(rejection) => return respond_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match state.cars.create(&car).await {
        Ok(()) => (StatusCode::CREATED, Json(car)).into_response(),
        Err(e) => {
            tracing::error!("Failed to create car {}: {}", car.id, e);
            respond_error(error_status(&e), e.to_string())
        }
    }
}

async fn handle_update_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Car>, JsonRejection>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Json(mut car) = match body {
        Ok(body) => body,
        Err(rejection) => return respond_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    car.id = id;

    match state.cars.update(&car).await {
        Ok(()) => Json(car).into_response(),
        Err(e) => {
            tracing::error!("Failed to update car {}: {}", id, e);
            respond_error(error_status(&e), e.to_string())
        }
    }
}

async fn handle_delete_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.cars.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!("Failed to delete car {}: {}", id, e);
            respond_error(error_status(&e), e.to_string())
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    let router = state.cars.router();
    match router.ping().await {
        Ok(()) => Json(HealthResponse {
            healthy: true,
            nodes: router.len(),
        })
        .into_response(),
        Err(e) => respond_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

async fn handle_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.cars.router().stats())
}
