// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP Adapter
//!
//! Exposes domain handlers as axum routes. Every adapter serves `GET /health`
//! from the aggregate health of the process, independently of what the
//! domain registers.
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | handler resolved | 200 | response content |
//! | no usable token on an authenticated route | 403 | `Unauthenticated` |
//! | unreadable path/query/body, body not JSON, mapping target invalid | 400 | `Bad request` |
//! | handler rejected or resolved empty | 500 | `Internal server error` |
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Implements the HTTP half of the dual-transport adapter

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection, RawPathParamsRejection};
use axum::extract::{Query, RawPathParams};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodFilter, MethodRouter};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::domain::context::ContextBuilder;
use crate::domain::errors::ConfigError;
use crate::domain::health::{HealthManager, HealthSignal};
use crate::domain::payload::{insert_path, PayloadError};
use crate::domain::service::{HttpMethod, HttpService};
use crate::presentation::handle::{shutdown_requested, ServerHandle};

pub const HEALTH_CHECK_NAME: &str = "HTTP server";
pub const HEALTH_ROUTE: &str = "/health";

const UNAUTHENTICATED: &str = "Unauthenticated";
const BAD_REQUEST: &str = "Bad request";
const INTERNAL_ERROR: &str = "Internal server error";

/// Prepends `/` when missing and rewrites `:param` segments into the
/// router's `{param}` capture syntax.
pub fn normalize_route(url: &str) -> String {
    let path = if url.starts_with('/') {
        url.to_string()
    } else {
        format!("/{}", url)
    };

    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{}}}", name),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

/// A registered service together with its normalized route.
struct Route {
    path: String,
    service: HttpService,
}

/// Unstarted HTTP adapter.
pub struct HttpAdapter {
    port: u16,
    health: HealthSignal,
    health_manager: HealthManager,
    // path -> method -> service; the last registration for a pair wins
    routes: BTreeMap<String, BTreeMap<HttpMethod, Arc<Route>>>,
}

impl HttpAdapter {
    pub fn new(port: u16, health_manager: &HealthManager) -> Self {
        let health = HealthSignal::new(false);
        health_manager.register_check(HEALTH_CHECK_NAME, health.clone());
        info!("Registering HTTP health route: GET {}", HEALTH_ROUTE);

        Self {
            port,
            health,
            health_manager: health_manager.clone(),
            routes: BTreeMap::new(),
        }
    }

    pub fn health(&self) -> &HealthSignal {
        &self.health
    }

    pub fn register_service(&mut self, service: HttpService) -> Result<(), ConfigError> {
        let path = normalize_route(&service.url);
        if path == HEALTH_ROUTE && service.method == HttpMethod::Get {
            return Err(ConfigError::ReservedRoute {
                method: service.method.to_string(),
                path,
            });
        }

        info!("Registering HTTP service: {} {}", service.method, path);
        self.routes
            .entry(path.clone())
            .or_default()
            .insert(service.method, Arc::new(Route { path, service }));
        Ok(())
    }

    /// Router with the health route and every registered service.
    pub fn router(&self) -> Router {
        let health_manager = self.health_manager.clone();
        let mut router = Router::new().route(
            HEALTH_ROUTE,
            get(move || {
                let health_manager = health_manager.clone();
                async move { health_response(&health_manager) }
            }),
        );

        for (path, services) in &self.routes {
            let mut method_router: MethodRouter = MethodRouter::new();
            for (method, route) in services {
                let route = route.clone();
                // Extraction failures are handled after the auth check.
                method_router = method_router.on(
                    method_filter(*method),
                    move |params: Result<RawPathParams, RawPathParamsRejection>,
                          query: Result<Query<HashMap<String, String>>, QueryRejection>,
                          headers: HeaderMap,
                          body: Result<Bytes, BytesRejection>| {
                        let route = route.clone();
                        async move { handle_request(&route, params, query, &headers, body).await }
                    },
                );
            }
            router = router.route(path, method_router);
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Binds `0.0.0.0:<port>` and serves in the background. The health
    /// signal flips to healthy as soon as the listener is bound.
    pub async fn start(self) -> Result<ServerHandle, ConfigError> {
        let router = self.router();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ConfigError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ConfigError::Bind { addr, source })?;

        info!("Http server started listening on: {}", local_addr.port());
        self.health.set(true);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_requested(shutdown_rx))
                .await
                .context("HTTP server failed")
        });

        Ok(ServerHandle::new("HTTP server", local_addr, shutdown_tx, task))
    }
}

fn health_response(health_manager: &HealthManager) -> Response {
    if health_manager.healthy() {
        (StatusCode::OK, "Healthy").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Unhealthy").into_response()
    }
}

/// Builds the handler payload: the JSON body (empty body -> `{}`) with the
/// mapped query and route parameters merged in.
fn build_payload(
    service: &HttpService,
    params: Result<RawPathParams, RawPathParamsRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Value, PayloadError> {
    let params = params.map_err(|e| PayloadError::InvalidRequest(e.body_text()))?;
    let Query(query) = query.map_err(|e| PayloadError::InvalidRequest(e.body_text()))?;
    let body = body.map_err(|e| PayloadError::InvalidRequest(e.body_text()))?;

    let mut payload = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|e| PayloadError::InvalidBody(e.to_string()))?
    };

    for (source, target) in &service.query_mapping {
        if let Some(value) = query.get(source) {
            insert_path(&mut payload, target, Value::String(value.clone()))?;
        }
    }

    for (source, target) in &service.url_mapping {
        if let Some((_, value)) = params.iter().find(|(name, _)| *name == source.as_str()) {
            insert_path(&mut payload, target, Value::String(value.to_string()))?;
        }
    }

    Ok(payload)
}

async fn handle_request(
    route: &Route,
    params: Result<RawPathParams, RawPathParamsRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let service = &route.service;
    let context = match ContextBuilder::http(headers, service.unauthenticated) {
        Ok(context) => context,
        Err(e) => {
            debug!(route = %route.path, "Rejecting request: {}", e);
            record_outcome(route, StatusCode::FORBIDDEN);
            return (StatusCode::FORBIDDEN, UNAUTHENTICATED).into_response();
        }
    };

    let payload = match build_payload(service, params, query, body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(route = %route.path, "Rejecting request: {}", e);
            record_outcome(route, StatusCode::BAD_REQUEST);
            return (StatusCode::BAD_REQUEST, BAD_REQUEST).into_response();
        }
    };

    let request_id = context.request_id.clone().unwrap_or_default();
    match service.handler.handle(context, payload).await {
        Ok(Some(response)) => {
            record_outcome(route, StatusCode::OK);
            content_response(response.content)
        }
        Ok(None) => {
            error!(
                route = %route.path,
                request_id = %request_id,
                "Unexpected error when handling HTTP request: Empty response returned"
            );
            record_outcome(route, StatusCode::INTERNAL_SERVER_ERROR);
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).into_response()
        }
        Err(e) => {
            // Classified or not, HTTP callers only ever see the generic 500.
            error!(
                route = %route.path,
                request_id = %request_id,
                code = ?e.code(),
                "Unexpected error when handling HTTP request: {:#}",
                e
            );
            record_outcome(route, StatusCode::INTERNAL_SERVER_ERROR);
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).into_response()
        }
    }
}

fn content_response(content: String) -> Response {
    let content_type = if serde_json::from_str::<serde::de::IgnoredAny>(&content).is_ok() {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    };
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], content).into_response()
}

fn record_outcome(route: &Route, status: StatusCode) {
    metrics::counter!(
        "microchassis_requests_total",
        "transport" => "http",
        "route" => route.path.clone(),
        "code" => status.as_u16().to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_route() {
        assert_eq!(normalize_route("foobar"), "/foobar");
        assert_eq!(normalize_route("/foobar"), "/foobar");
        assert_eq!(normalize_route("/:id/:id2/foobar"), "/{id}/{id2}/foobar");
        assert_eq!(normalize_route("users/{id}"), "/users/{id}");
        assert_eq!(normalize_route(""), "/");
    }

    #[test]
    fn test_health_route_is_reserved() {
        let mut adapter = HttpAdapter::new(0, &HealthManager::new());
        let service = HttpService::new(
            "health",
            crate::domain::service::handler_fn(|_, _| async { Ok(None) }),
        );
        assert!(matches!(
            adapter.register_service(service),
            Err(ConfigError::ReservedRoute { .. })
        ));
    }

    #[test]
    fn test_registers_unhealthy_check() {
        let health = HealthManager::new();
        let adapter = HttpAdapter::new(0, &health);
        assert!(!adapter.health().get());
        assert_eq!(health.checks(), vec![(HEALTH_CHECK_NAME.to_string(), false)]);
    }
}
