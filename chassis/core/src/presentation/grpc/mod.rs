// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! gRPC Adapter
//!
//! Exposes domain handlers as the unary methods of a protobuf service
//! loaded at runtime.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Implements the gRPC half of the dual-transport adapter

pub mod method;
pub mod server;

pub use method::GrpcMethod;
pub use server::GrpcAdapter;
