// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-method gRPC transport handler.
//!
//! [`GrpcMethod::call`] is the transport-independent half: metadata and a
//! decoded payload in, a response message or a `Status` out. [`MethodRoute`] plugs
//! it into tonic's unary machinery with the [`JsonCodec`].

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use axum::body::Body;
use futures::future::BoxFuture;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use serde_json::Value;
use tonic::metadata::MetadataMap;
use tonic::server::{Grpc, UnaryService};
use tonic::{Code, Status};
use tracing::{error, info};

use crate::domain::context::ContextBuilder;
use crate::domain::errors::ServiceError;
use crate::domain::service::ServiceHandler;
use crate::infrastructure::codec::{json_to_message, JsonCodec};

pub(crate) const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub struct GrpcMethod {
    name: String,
    handler: Arc<dyn ServiceHandler>,
    request_type: MessageDescriptor,
    response_type: MessageDescriptor,
}

impl GrpcMethod {
    pub(crate) fn new(
        name: String,
        handler: Arc<dyn ServiceHandler>,
        request_type: MessageDescriptor,
        response_type: MessageDescriptor,
    ) -> Self {
        Self {
            name,
            handler,
            request_type,
            response_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the domain handler for one call and converts its content into
    /// the output message. Every outcome is logged before it is returned;
    /// unclassified failures never reach the wire.
    pub async fn call(
        &self,
        metadata: &MetadataMap,
        payload: Value,
    ) -> Result<DynamicMessage, Status> {
        info!("GRPC request started {}", self.name);
        let context = ContextBuilder::grpc(metadata);
        let request_id = context.request_id.clone().unwrap_or_default();

        let result = match self.handler.handle(context, payload).await {
            Ok(Some(response)) => match json_to_message(&self.response_type, &response.content) {
                Ok(message) => Ok(message),
                Err(e) => {
                    error!(
                        method = %self.name,
                        request_id = %request_id,
                        "Unexpected error when handling gRPC call: Response does not match {}: {}",
                        self.response_type.full_name(),
                        e
                    );
                    Err(Status::internal(INTERNAL_ERROR_MESSAGE))
                }
            },
            Ok(None) => {
                error!(
                    method = %self.name,
                    request_id = %request_id,
                    "Unexpected error when handling gRPC call: Empty response returned"
                );
                Err(Status::internal(INTERNAL_ERROR_MESSAGE))
            }
            Err(ServiceError::Application { code, message }) => {
                error!(
                    method = %self.name,
                    request_id = %request_id,
                    code = ?code,
                    "Unexpected error when handling gRPC call: {}",
                    message
                );
                Err(Status::new(code, message))
            }
            Err(ServiceError::Internal(e)) => {
                error!(
                    method = %self.name,
                    request_id = %request_id,
                    "Unexpected error when handling gRPC call: {:#}",
                    e
                );
                Err(Status::internal(INTERNAL_ERROR_MESSAGE))
            }
        };

        let code = match &result {
            Ok(_) => Code::Ok,
            Err(status) => status.code(),
        };
        metrics::counter!(
            "microchassis_requests_total",
            "transport" => "grpc",
            "method" => self.name.clone(),
            "code" => format!("{:?}", code)
        )
        .increment(1);
        if result.is_ok() {
            info!("GRPC request finished {}", self.name);
        }

        result
    }
}

struct UnaryCall(Arc<GrpcMethod>);

impl UnaryService<Value> for UnaryCall {
    type Response = DynamicMessage;
    type Future = BoxFuture<'static, Result<tonic::Response<DynamicMessage>, Status>>;

    fn call(&mut self, request: tonic::Request<Value>) -> Self::Future {
        let method = self.0.clone();
        Box::pin(async move {
            let (metadata, _extensions, payload) = request.into_parts();
            method
                .call(&metadata, payload)
                .await
                .map(tonic::Response::new)
        })
    }
}

/// Routes one `/<package>.<Service>/<Method>` path.
#[derive(Clone)]
pub(crate) struct MethodRoute(pub(crate) Arc<GrpcMethod>);

impl tower::Service<axum::http::Request<Body>> for MethodRoute {
    type Response = axum::http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: axum::http::Request<Body>) -> Self::Future {
        let method = self.0.clone();
        Box::pin(async move {
            let codec = JsonCodec::new(method.request_type.clone());
            let mut grpc = Grpc::new(codec);
            Ok(grpc.unary(UnaryCall(method), request).await)
        })
    }
}

/// Fallback for paths that match no declared method.
pub(crate) async fn unimplemented(uri: axum::http::Uri) -> axum::response::Response {
    Status::unimplemented(format!("Unknown GRPC method: {}", uri.path())).into_http()
}
