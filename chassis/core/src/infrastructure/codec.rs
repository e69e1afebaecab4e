// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! JSON ⇄ protobuf codec for dynamically described messages.
//!
//! Request bytes are decoded with the method's input descriptor and handed to
//! domain handlers as `serde_json::Value`. Responses are converted to a
//! [`DynamicMessage`] by the caller (see [`json_to_message`]) before they reach
//! the encoder, so schema mismatches are handled where they can be logged.

use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};
use serde_json::Value;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::Status;
use tracing::debug;

/// Parses `content` as proto3 JSON for `descriptor`. Trailing input is an
/// error.
pub fn json_to_message(
    descriptor: &MessageDescriptor,
    content: &str,
) -> Result<DynamicMessage, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_str(content);
    let message = DynamicMessage::deserialize(descriptor.clone(), &mut deserializer)?;
    deserializer.end()?;
    Ok(message)
}

pub fn message_to_json(message: &DynamicMessage) -> Result<Value, serde_json::Error> {
    serde_json::to_value(message)
}

/// Encodes outgoing [`DynamicMessage`]s and decodes incoming bytes with
/// `decode_as` into JSON.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    decode_as: MessageDescriptor,
}

impl JsonCodec {
    pub fn new(decode_as: MessageDescriptor) -> Self {
        Self { decode_as }
    }
}

impl Codec for JsonCodec {
    type Encode = DynamicMessage;
    type Decode = Value;
    type Encoder = JsonEncoder;
    type Decoder = JsonDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        JsonEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        JsonDecoder(self.decode_as.clone())
    }
}

#[derive(Debug)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode(dst).map_err(|e| {
            debug!("Failed to encode {}: {}", item.descriptor().full_name(), e);
            Status::internal("Internal server error")
        })
    }
}

#[derive(Debug)]
pub struct JsonDecoder(MessageDescriptor);

impl Decoder for JsonDecoder {
    type Item = Value;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let message = DynamicMessage::decode(self.0.clone(), src).map_err(|e| {
            debug!("Malformed {}: {}", self.0.full_name(), e);
            Status::invalid_argument(format!("Malformed {}", self.0.full_name()))
        })?;
        message_to_json(&message)
            .map(Some)
            .map_err(|_| Status::internal("Internal server error"))
    }
}
