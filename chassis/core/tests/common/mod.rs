// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures for the adapter integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use microchassis_core::infrastructure::{ProtoConfig, ProtoDefinition};
use microchassis_core::{Context, ServiceHandler};
use parking_lot::Mutex;
use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};
use serde_json::Value;

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

/// `acme.greeter.Greeter` with unary `SayHello` and `SayGoodbye`.
pub fn greeter_definition() -> ProtoDefinition {
    let method = |name: &str| MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(".acme.greeter.HelloRequest".to_string()),
        output_type: Some(".acme.greeter.HelloReply".to_string()),
        ..Default::default()
    };

    let file = FileDescriptorProto {
        name: Some("greeter.proto".to_string()),
        package: Some("acme.greeter".to_string()),
        message_type: vec![
            DescriptorProto {
                name: Some("HelloRequest".to_string()),
                field: vec![string_field("name", 1)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("HelloReply".to_string()),
                field: vec![string_field("message", 1)],
                ..Default::default()
            },
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("Greeter".to_string()),
            method: vec![method("SayHello"), method("SayGoodbye")],
            ..Default::default()
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    };

    let bytes = FileDescriptorSet { file: vec![file] }.encode_to_vec();
    ProtoDefinition::from_descriptor_set_bytes(&bytes).unwrap()
}

pub fn greeter_config() -> ProtoConfig {
    ProtoConfig {
        descriptor_set: None,
        package: Some("acme.greeter".to_string()),
        service: "Greeter".to_string(),
    }
}

/// Records every invocation a handler receives.
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<(Context, Value)>>>);

impl Calls {
    pub fn record(&self, ctx: Context, payload: Value) {
        self.0.lock().push((ctx, payload));
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn last(&self) -> (Context, Value) {
        self.0.lock().last().cloned().expect("handler was not invoked")
    }
}

/// Handler that records the call and answers with `content`.
pub fn recording_handler(calls: &Calls, content: &'static str) -> Arc<dyn ServiceHandler> {
    let calls = calls.clone();
    microchassis_core::handler_fn(move |ctx, payload| {
        calls.record(ctx, payload);
        async move { Ok(Some(microchassis_core::ServiceResponse::new(content))) }
    })
}
