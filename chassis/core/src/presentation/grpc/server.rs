// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! gRPC adapter.
//! Binds domain handlers to the methods of one protobuf service and serves
//! them with tonic.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::Routes;
use tracing::{info, warn};

use super::method::{unimplemented, GrpcMethod, MethodRoute};
use crate::domain::errors::ConfigError;
use crate::domain::health::{HealthManager, HealthSignal};
use crate::domain::service::GrpcService;
use crate::infrastructure::config::ProtoConfig;
use crate::infrastructure::proto::{normalize_method_name, ProtoDefinition, ServiceDefinition};
use crate::presentation::handle::{shutdown_requested, ServerHandle};

pub const HEALTH_CHECK_NAME: &str = "GRPC server";

/// Unstarted gRPC adapter. [`GrpcAdapter::start`] consumes it; there is no
/// way back to registration once the listener is bound.
pub struct GrpcAdapter {
    port: u16,
    definition: ServiceDefinition,
    methods: BTreeMap<String, Arc<GrpcMethod>>,
    health: HealthSignal,
}

impl GrpcAdapter {
    pub fn new(
        proto: &ProtoDefinition,
        config: &ProtoConfig,
        port: u16,
        health_manager: &HealthManager,
    ) -> Result<Self, ConfigError> {
        let definition = proto.service(config)?;
        let health = HealthSignal::new(false);
        health_manager.register_check(HEALTH_CHECK_NAME, health.clone());

        Ok(Self {
            port,
            definition,
            methods: BTreeMap::new(),
            health,
        })
    }

    pub fn health(&self) -> &HealthSignal {
        &self.health
    }

    pub fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    /// Binds `service` to the declared method it names. Registering the same
    /// method twice replaces the earlier handler.
    pub fn register_service(&mut self, service: GrpcService) -> Result<(), ConfigError> {
        let name = normalize_method_name(&service.grpc_method);
        info!("Registering GRPC service: {}", name);

        let declared = self
            .definition
            .method(&name)
            .ok_or_else(|| ConfigError::UnknownMethod(name.clone()))?;
        if !declared.is_unary() {
            return Err(ConfigError::StreamingUnsupported(name));
        }

        let method = GrpcMethod::new(
            name.clone(),
            service.handler,
            declared.request_type.clone(),
            declared.response_type.clone(),
        );
        self.methods.insert(name, Arc::new(method));
        Ok(())
    }

    /// Declared unary methods that have no registered handler, in name order.
    /// Streaming methods cannot be implemented and are not counted.
    pub fn missing_methods(&self) -> Vec<String> {
        self.definition
            .methods
            .iter()
            .filter(|(name, declared)| declared.is_unary() && !self.methods.contains_key(*name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Validates that every declared method is implemented, binds
    /// `0.0.0.0:<port>` over plaintext HTTP/2 and starts serving. The health
    /// signal flips to healthy once the server task is running.
    pub async fn start(self) -> Result<ServerHandle, ConfigError> {
        let missing = self.missing_methods();
        if !missing.is_empty() {
            return Err(ConfigError::MissingImplementations(missing));
        }

        let mut router = axum::Router::new();
        for (name, declared) in &self.definition.methods {
            match self.methods.get(name) {
                Some(method) => {
                    router = router.route_service(&declared.path, MethodRoute(method.clone()));
                }
                None => warn!("Streaming GRPC method {} will answer UNIMPLEMENTED", name),
            }
        }
        let router = router.fallback(unimplemented);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ConfigError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ConfigError::Bind { addr, source })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let incoming = TcpListenerStream::new(listener);
        let task = tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_routes(Routes::from(router))
                .serve_with_incoming_shutdown(incoming, shutdown_requested(shutdown_rx))
                .await
                .context("GRPC server failed")
        });

        info!("Grpc server started listening on: {}", local_addr.port());
        self.health.set(true);

        Ok(ServerHandle::new("GRPC server", local_addr, shutdown_tx, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::{handler_fn, ServiceResponse};
    use crate::infrastructure::proto::test_support::users_descriptor_set;

    fn adapter(health: &HealthManager) -> GrpcAdapter {
        let proto = ProtoDefinition::from_descriptor_set_bytes(&users_descriptor_set()).unwrap();
        let config = ProtoConfig {
            descriptor_set: None,
            package: Some("test.users".to_string()),
            service: "UserService".to_string(),
        };
        GrpcAdapter::new(&proto, &config, 0, health).unwrap()
    }

    fn echo(name: &str) -> GrpcService {
        GrpcService::new(
            name,
            handler_fn(|_, _| async { Ok(Some(ServiceResponse::new("{}"))) }),
        )
    }

    #[test]
    fn test_registers_unhealthy_check() {
        let health = HealthManager::new();
        let adapter = adapter(&health);
        assert!(!adapter.health().get());
        assert_eq!(health.checks(), vec![(HEALTH_CHECK_NAME.to_string(), false)]);
        assert!(!health.healthy());
    }

    #[test]
    fn test_register_accepts_declared_and_wire_names() {
        let mut adapter = adapter(&HealthManager::new());
        adapter.register_service(echo("GetUser")).unwrap();
        assert_eq!(adapter.missing_methods(), vec!["listUsers".to_string()]);
        adapter.register_service(echo("listUsers")).unwrap();
        assert!(adapter.missing_methods().is_empty());
    }

    #[test]
    fn test_register_unknown_method_fails() {
        let mut adapter = adapter(&HealthManager::new());
        let err = adapter.register_service(echo("DeleteUser")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMethod(name) if name == "deleteUser"));
    }

    #[test]
    fn test_register_streaming_method_fails() {
        let mut adapter = adapter(&HealthManager::new());
        let err = adapter.register_service(echo("WatchUsers")).unwrap_err();
        assert!(matches!(err, ConfigError::StreamingUnsupported(name) if name == "watchUsers"));
    }

    #[tokio::test]
    async fn test_start_lists_every_missing_method() {
        let health = HealthManager::new();
        let adapter = adapter(&health);

        let err = adapter.start().await.unwrap_err();
        match err {
            ConfigError::MissingImplementations(missing) => {
                assert_eq!(missing, vec!["getUser".to_string(), "listUsers".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!health.healthy());
    }
}
