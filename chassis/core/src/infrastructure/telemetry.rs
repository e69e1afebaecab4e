// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Logging setup and instance identity.
//!
//! Every record emitted inside [`instance_span`] carries an `instance_id`
//! field, so logs from several replicas of the same service can be told apart.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing::Span;

use crate::infrastructure::config::{ChassisConfig, LogFormat, LoggingConfig};

static GENERATED_INSTANCE_ID: OnceLock<String> = OnceLock::new();

/// Configured instance id, or a random UUID generated once per process.
pub fn instance_id(config: &ChassisConfig) -> String {
    match &config.instance_id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => GENERATED_INSTANCE_ID
            .get_or_init(|| uuid::Uuid::new_v4().to_string())
            .clone(),
    }
}

/// Root span stamping `instance_id` on every record emitted inside it.
pub fn instance_span(instance_id: &str) -> Span {
    tracing::info_span!("microchassis", instance_id = %instance_id)
}

/// Initialize tracing subscriber for logging. `RUST_LOG` takes precedence
/// over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_target(false).compact().try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
