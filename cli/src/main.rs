// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # microchassis reference service
//!
//! Loads a compiled protobuf descriptor set and exposes every unary method of
//! the configured service twice: natively over gRPC and as `POST /<method>`
//! over HTTP, backed by the same echo handler. `GET /echo/{name}` and the
//! built-in `GET /health` round out the HTTP surface.
//!
//! Configuration precedence: CLI flags, then `MICROCHASSIS_*` environment
//! variables, then the YAML file, then defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Map, Value};
use tokio::signal;
use tracing::{info, warn, Instrument};

use microchassis_core::infrastructure::config::LogFormat;
use microchassis_core::infrastructure::telemetry::{init_tracing, instance_id, instance_span};
use microchassis_core::infrastructure::{ChassisConfig, MethodDefinition, ProtoDefinition};
use microchassis_core::{
    handler_fn, GrpcAdapter, GrpcService, HealthManager, HttpAdapter, HttpMethod, HttpService,
    ServiceHandler, ServiceResponse,
};

/// microchassis - one handler, two transports
#[derive(Parser)]
#[command(name = "microchassis")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, env = "MICROCHASSIS_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Compiled FileDescriptorSet (overrides proto.descriptor_set)
    #[arg(long, value_name = "FILE")]
    descriptor_set: Option<PathBuf>,

    /// gRPC listen port (overrides config)
    #[arg(long)]
    grpc_port: Option<u16>,

    /// HTTP listen port (overrides config)
    #[arg(long)]
    http_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MICROCHASSIS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ChassisConfig::load_or_default(cli.config)?;
    if let Some(port) = cli.grpc_port {
        config.grpc_port = port;
    }
    if let Some(port) = cli.http_port {
        config.http_port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    if let Some(path) = cli.descriptor_set {
        config.proto.descriptor_set = Some(path);
    }
    config.validate()?;

    init_tracing(&config.logging)?;
    let id = instance_id(&config);
    run(config, id.clone()).instrument(instance_span(&id)).await
}

async fn run(config: ChassisConfig, instance: String) -> Result<()> {
    info!(
        "Starting microchassis {} for service {}",
        env!("CARGO_PKG_VERSION"),
        config.proto.service
    );

    if let Some(metrics) = config.metrics.as_ref().filter(|m| m.enabled) {
        let addr = SocketAddr::from(([0, 0, 0, 0], metrics.port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics exposed on {}", addr);
    }

    let descriptor_set = config
        .proto
        .descriptor_set
        .as_ref()
        .context("proto.descriptor_set must point at a compiled descriptor set")?;
    let proto = ProtoDefinition::from_descriptor_set_file(descriptor_set)?;

    let health = HealthManager::new();
    health.subscribe(|healthy| info!(healthy, "Aggregate health changed"));

    let mut grpc = GrpcAdapter::new(&proto, &config.proto, config.grpc_port, &health)?;
    let mut http = HttpAdapter::new(config.http_port, &health);

    let methods: Vec<(String, MethodDefinition)> = grpc
        .definition()
        .methods
        .iter()
        .filter(|(_, method)| method.is_unary())
        .map(|(name, method)| (name.clone(), method.clone()))
        .collect();

    for (name, method) in methods {
        let handler = echo_handler(method);
        grpc.register_service(GrpcService::new(name.clone(), handler.clone()))?;
        http.register_service(HttpService::new(name, handler).method(HttpMethod::Post))?;
    }

    http.register_service(
        HttpService::new(
            "/echo/:name",
            handler_fn(move |ctx, payload| {
                let instance = instance.clone();
                async move {
                    ServiceResponse::json(&serde_json::json!({
                        "name": payload.get("name").cloned().unwrap_or(Value::Null),
                        "instanceId": instance,
                        "requestId": ctx.request_id,
                    }))
                    .map(Some)
                }
            }),
        )
        .unauthenticated()
        .url_mapping([("name", "name")]),
    )?;

    let grpc = grpc.start().await?;
    let http = http.start().await?;
    info!(
        grpc = %grpc.local_addr(),
        http = %http.local_addr(),
        "microchassis is serving"
    );

    shutdown_signal().await;

    let grpc_result = grpc.shutdown().await;
    let http_result = http.shutdown().await;
    grpc_result?;
    http_result?;

    info!("microchassis stopped");
    Ok(())
}

/// Answers with the payload fields that also exist on the response message,
/// so the reply always encodes against the method's output type.
fn echo_handler(method: MethodDefinition) -> Arc<dyn ServiceHandler> {
    handler_fn(move |ctx, payload| {
        let response_type = method.response_type.clone();
        async move {
            let reply: Map<String, Value> = payload
                .as_object()
                .into_iter()
                .flatten()
                .filter(|(key, _)| {
                    response_type.get_field_by_json_name(key).is_some()
                        || response_type.get_field_by_name(key).is_some()
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

            info!(
                request_id = ctx.request_id.as_deref().unwrap_or_default(),
                fields = reply.len(),
                "Echoing request"
            );
            ServiceResponse::json(&Value::Object(reply)).map(Some)
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
