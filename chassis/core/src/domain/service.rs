// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service Descriptors
//!
//! A domain handler is written once against [`ServiceHandler`] and then
//! registered with one or both adapters through a transport-specific
//! descriptor ([`GrpcService`], [`HttpService`]).
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the transport-agnostic handler contract

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::context::Context;
use crate::domain::errors::ServiceError;

/// Serialized payload a handler resolves with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub content: String,
}

impl ServiceResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Serializes `value` as JSON content.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, ServiceError> {
        let content = serde_json::to_string(value).map_err(anyhow::Error::from)?;
        Ok(Self { content })
    }
}

/// `Ok(None)` means the handler resolved without a response, which both
/// adapters treat as an internal error.
pub type HandlerResult = Result<Option<ServiceResponse>, ServiceError>;

/// Transport-agnostic domain handler.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    async fn handle(&self, ctx: Context, payload: Value) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> ServiceHandler for F
where
    F: Fn(Context, Value) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn handle(&self, ctx: Context, payload: Value) -> HandlerResult {
        (self)(ctx, payload).await
    }
}

/// Boxes an async closure as a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ServiceHandler>
where
    F: Fn(Context, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}

/// Registration record for the gRPC adapter. `grpc_method` is the method
/// name as declared in the `.proto` file (`GetUser`) or its wire form
/// (`getUser`); both resolve to the same method.
#[derive(Clone)]
pub struct GrpcService {
    pub grpc_method: String,
    pub handler: Arc<dyn ServiceHandler>,
}

impl GrpcService {
    pub fn new(grpc_method: impl Into<String>, handler: Arc<dyn ServiceHandler>) -> Self {
        Self {
            grpc_method: grpc_method.into(),
            handler,
        }
    }
}

impl fmt::Debug for GrpcService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcService")
            .field("grpc_method", &self.grpc_method)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration record for the HTTP adapter.
///
/// `query_mapping` and `url_mapping` map a query-string key / route
/// parameter name to a dot-separated path inside the payload handed to the
/// handler (`"bar" -> "some.other.key"`).
#[derive(Clone)]
pub struct HttpService {
    pub url: String,
    pub method: HttpMethod,
    pub handler: Arc<dyn ServiceHandler>,
    pub unauthenticated: bool,
    pub query_mapping: BTreeMap<String, String>,
    pub url_mapping: BTreeMap<String, String>,
}

impl HttpService {
    pub fn new(url: impl Into<String>, handler: Arc<dyn ServiceHandler>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::default(),
            handler,
            unauthenticated: false,
            query_mapping: BTreeMap::new(),
            url_mapping: BTreeMap::new(),
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.unauthenticated = true;
        self
    }

    pub fn query_mapping<I, K, V>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query_mapping
            .extend(mapping.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn url_mapping<I, K, V>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.url_mapping
            .extend(mapping.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

impl fmt::Debug for HttpService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpService")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("unauthenticated", &self.unauthenticated)
            .field("query_mapping", &self.query_mapping)
            .field("url_mapping", &self.url_mapping)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_handler() {
        let handler = handler_fn(|ctx: Context, payload: Value| async move {
            Ok(Some(ServiceResponse::new(format!(
                "{}:{}",
                ctx.token, payload["name"]
            ))))
        });

        let ctx = Context {
            token: "abc".to_string(),
            ..Default::default()
        };
        let response = handler
            .handle(ctx, serde_json::json!({ "name": "bob" }))
            .await
            .unwrap();
        assert_eq!(response, Some(ServiceResponse::new("abc:\"bob\"")));
    }

    #[test]
    fn test_http_service_defaults() {
        let service = HttpService::new("foobar", handler_fn(|_, _| async { Ok(None) }));
        assert_eq!(service.method, HttpMethod::Get);
        assert!(!service.unauthenticated);
        assert!(service.query_mapping.is_empty());

        let service = service
            .method(HttpMethod::Post)
            .unauthenticated()
            .query_mapping([("bar", "some.other.key")]);
        assert_eq!(service.method, HttpMethod::Post);
        assert!(service.unauthenticated);
        assert_eq!(
            service.query_mapping.get("bar").map(String::as_str),
            Some("some.other.key")
        );
    }

    #[test]
    fn test_json_response() {
        let response = ServiceResponse::json(&serde_json::json!({ "ok": true })).unwrap();
        assert_eq!(response.content, r#"{"ok":true}"#);
    }
}
