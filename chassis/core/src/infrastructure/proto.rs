// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Loaded Protobuf Definitions
//!
//! Wraps an already-compiled descriptor pool (`protoc --descriptor_set_out`
//! output, or one assembled in memory) and exposes the method table of a
//! single service, keyed by wire method name.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements the protobuf definition collaborator of the gRPC adapter

use std::collections::BTreeMap;
use std::path::Path;

use prost_reflect::{DescriptorPool, MessageDescriptor};

use crate::domain::errors::ConfigError;
use crate::infrastructure::config::ProtoConfig;

/// Lower-cases the first character of a method name.
///
/// protobuf declares `CapitalizedMethods`; the wire-level convention used
/// by service implementations is `camelCasedMethods`. Idempotent.
pub fn normalize_method_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct ProtoDefinition {
    pool: DescriptorPool,
}

impl ProtoDefinition {
    pub fn new(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    /// Decodes an encoded `FileDescriptorSet`.
    pub fn from_descriptor_set_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let pool =
            DescriptorPool::decode(bytes).map_err(|e| ConfigError::Descriptor(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_descriptor_set_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ConfigError::Descriptor(format!("{}: {}", path.display(), e)))?;
        Self::from_descriptor_set_bytes(&bytes)
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Resolves the service named by `config` (`package.Service`, or just
    /// `Service` when no package is configured).
    pub fn service(&self, config: &ProtoConfig) -> Result<ServiceDefinition, ConfigError> {
        let full_name = match config.package.as_deref() {
            Some(package) if !package.is_empty() => format!("{}.{}", package, config.service),
            _ => config.service.clone(),
        };

        let service = self
            .pool
            .get_service_by_name(&full_name)
            .ok_or_else(|| ConfigError::UnknownService(full_name.clone()))?;

        let methods = service
            .methods()
            .map(|method| {
                let definition = MethodDefinition {
                    original_name: method.name().to_string(),
                    path: format!("/{}/{}", service.full_name(), method.name()),
                    request_type: method.input(),
                    response_type: method.output(),
                    client_streaming: method.is_client_streaming(),
                    server_streaming: method.is_server_streaming(),
                };
                (normalize_method_name(method.name()), definition)
            })
            .collect();

        Ok(ServiceDefinition { full_name, methods })
    }
}

/// Method table of one protobuf service.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    pub full_name: String,
    /// Keyed by normalized (wire) method name.
    pub methods: BTreeMap<String, MethodDefinition>,
}

impl ServiceDefinition {
    pub fn method(&self, name: &str) -> Option<&MethodDefinition> {
        self.methods.get(name)
    }
}

#[derive(Debug, Clone)]
pub struct MethodDefinition {
    pub original_name: String,
    /// HTTP/2 route, `/<package>.<Service>/<OriginalName>`.
    pub path: String,
    pub request_type: MessageDescriptor,
    pub response_type: MessageDescriptor,
    pub client_streaming: bool,
    pub server_streaming: bool,
}

impl MethodDefinition {
    pub fn is_unary(&self) -> bool {
        !self.client_streaming && !self.server_streaming
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use prost::Message;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{
        DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
        MethodDescriptorProto, ServiceDescriptorProto,
    };

    fn string_field(name: &str, number: i32) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::String as i32),
            json_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            field: fields,
            ..Default::default()
        }
    }

    fn method(name: &str, input: &str, output: &str, server_streaming: bool) -> MethodDescriptorProto {
        MethodDescriptorProto {
            name: Some(name.to_string()),
            input_type: Some(format!(".test.users.{}", input)),
            output_type: Some(format!(".test.users.{}", output)),
            server_streaming: Some(server_streaming),
            ..Default::default()
        }
    }

    /// `test.users.UserService` with `GetUser`, `ListUsers` and a
    /// server-streaming `WatchUsers`.
    pub fn users_descriptor_set() -> Vec<u8> {
        let file = FileDescriptorProto {
            name: Some("users.proto".to_string()),
            package: Some("test.users".to_string()),
            message_type: vec![
                message("GetUserRequest", vec![string_field("id", 1)]),
                message("User", vec![string_field("id", 1), string_field("name", 2)]),
                message("ListUsersRequest", vec![string_field("filter", 1)]),
            ],
            service: vec![ServiceDescriptorProto {
                name: Some("UserService".to_string()),
                method: vec![
                    method("GetUser", "GetUserRequest", "User", false),
                    method("ListUsers", "ListUsersRequest", "User", false),
                    method("WatchUsers", "ListUsersRequest", "User", true),
                ],
                ..Default::default()
            }],
            syntax: Some("proto3".to_string()),
            ..Default::default()
        };

        FileDescriptorSet { file: vec![file] }.encode_to_vec()
    }
}
