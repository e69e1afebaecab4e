// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`microchassis-core`)
//!
//! The two transport adapters. **No business logic lives here**: each
//! adapter only translates its transport's request shape into
//! `Context + payload`, calls the domain handler and translates the result
//! back into a transport status.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`http`] | HTTP/1.1 (Axum) | Routes + `/health` probe |
//! | [`grpc`] | gRPC (Tonic) | Unary methods of one runtime-loaded protobuf service |

pub mod grpc;
pub mod handle;
pub mod http;

pub use grpc::GrpcAdapter;
pub use handle::ServerHandle;
pub use http::HttpAdapter;
