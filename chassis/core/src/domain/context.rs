// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request Context
//!
//! Normalizes transport metadata (gRPC metadata, HTTP headers) into a single
//! [`Context`] handed to every domain handler.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the context builder shared by both adapters

use axum::http::HeaderMap;
use serde::Serialize;
use tonic::metadata::MetadataMap;

use crate::domain::errors::AuthError;

const TOKEN_PREFIX: &str = "Token ";

/// Per-request identity and trace metadata. Built fresh for each request
/// and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub token: String,
    pub request_id: Option<String>,
    pub user: Option<String>,
}

/// Read-only view over a transport's key/value metadata container.
pub trait MetadataSource {
    /// First value stored under `key`, if present and representable as text.
    fn first(&self, key: &str) -> Option<&str>;
}

impl MetadataSource for MetadataMap {
    fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|value| value.to_str().ok())
    }
}

impl MetadataSource for HeaderMap {
    fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|value| value.to_str().ok())
    }
}

/// Strips exactly one leading `"Token "` prefix. Any other prefix
/// (e.g. `Bearer `) is left intact.
pub fn strip_token_prefix(raw: &str) -> &str {
    raw.strip_prefix(TOKEN_PREFIX).unwrap_or(raw)
}

pub struct ContextBuilder;

impl ContextBuilder {
    /// Context for a gRPC call. A missing `authorization` entry yields an
    /// empty token; authentication is left to the domain handler.
    pub fn grpc(metadata: &MetadataMap) -> Context {
        let token = metadata
            .first("authorization")
            .map(strip_token_prefix)
            .unwrap_or_default()
            .to_string();

        Context {
            token,
            request_id: metadata.first("request-id").map(str::to_string),
            user: metadata.first("remoteuser").map(str::to_string),
        }
    }

    /// Context for an HTTP request.
    ///
    /// Routes that are not `unauthenticated` require a usable token: the
    /// `Authorization` header must be present and non-empty after the
    /// `Token ` prefix is removed.
    pub fn http(headers: &HeaderMap, unauthenticated: bool) -> Result<Context, AuthError> {
        let token = headers.first("authorization").map(strip_token_prefix);

        let token = match token {
            Some(token) if !token.is_empty() => token.to_string(),
            _ if unauthenticated => token.unwrap_or_default().to_string(),
            _ => return Err(AuthError::MissingToken),
        };

        Ok(Context {
            token,
            request_id: headers.first("x-request-id").map(str::to_string),
            user: None,
        })
    }
}
