// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error Taxonomy
//!
//! Three families of failure cross the adapter boundary:
//!
//! | Type | When | Outcome |
//! |------|------|---------|
//! | [`ConfigError`] | startup (registration, `start()`) | fatal, aborts startup |
//! | [`AuthError`] | per request, HTTP only | `403 Unauthenticated` |
//! | [`ServiceError`] | per request, raised by a domain handler | transport status code |
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the error taxonomy shared by both adapters

use std::net::SocketAddr;

use thiserror::Error;

/// Startup-time configuration failures. None of these are recoverable at
/// request time; `start()` refuses to bind a listener while any is pending.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown GRPC service '{0}' in loaded protobuf definition")]
    UnknownService(String),

    #[error("Trying to register unknown GRPC method: {0}")]
    UnknownMethod(String),

    #[error("GRPC method '{0}' is streaming; only unary methods are supported")]
    StreamingUnsupported(String),

    #[error("Missing GRPC implementation of services: {}", .0.join(", "))]
    MissingImplementations(Vec<String>),

    #[error("Route '{method} {path}' is reserved")]
    ReservedRoute { method: String, path: String },

    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid protobuf descriptor set: {0}")]
    Descriptor(String),

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

/// Per-request authentication failure on an authenticated HTTP route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Unauthenticated")]
    MissingToken,
}

/// Failure raised by a domain handler.
///
/// `Application` errors are classified: their code and message are surfaced
/// verbatim to gRPC callers. Everything else is `Internal` and is only ever
/// logged server-side.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Application { code: tonic::Code, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn application(code: tonic::Code, message: impl Into<String>) -> Self {
        Self::Application {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal(anyhow::anyhow!("{}", message))
    }

    /// The classified gRPC code, if this error carries one.
    pub fn code(&self) -> Option<tonic::Code> {
        match self {
            Self::Application { code, .. } => Some(*code),
            Self::Internal(_) => None,
        }
    }
}
