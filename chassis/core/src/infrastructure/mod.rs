// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod codec;
pub mod config;
pub mod proto;
pub mod telemetry;

pub use config::{ChassisConfig, LogFormat, LoggingConfig, MetricsConfig, ProtoConfig};
pub use proto::{normalize_method_name, MethodDefinition, ProtoDefinition, ServiceDefinition};
