// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer (`microchassis-core`)
//!
//! Transport-agnostic contracts: the request [`context::Context`], the
//! handler contract in [`service`], health aggregation and the error
//! taxonomy. Nothing here knows how a request arrived.

pub mod context;
pub mod errors;
pub mod health;
pub mod payload;
pub mod service;
