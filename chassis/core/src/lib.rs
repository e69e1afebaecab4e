// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # microchassis-core
//!
//! Write a request handler once, expose it over gRPC and HTTP.
//!
//! A [`ServiceHandler`] receives a normalized [`Context`] and a JSON payload
//! and resolves with a [`ServiceResponse`]. The [`GrpcAdapter`] and
//! [`HttpAdapter`] translate their transport's requests into that contract,
//! map handler failures back to transport status codes and report their
//! liveness to a shared [`HealthManager`].
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Implements the dual-transport service adapter

pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::context::{Context, ContextBuilder};
pub use domain::errors::{AuthError, ConfigError, ServiceError};
pub use domain::health::{HealthManager, HealthSignal};
pub use domain::service::{
    handler_fn, GrpcService, HandlerResult, HttpMethod, HttpService, ServiceHandler,
    ServiceResponse,
};
pub use presentation::{GrpcAdapter, HttpAdapter, ServerHandle};
