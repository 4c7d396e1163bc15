// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Linewise queue service.
//!
//! Translates REST calls and WebSocket sessions into coordinator operations.
//! Bearer tokens are resolved through the authentication collaborator and
//! service ownership through the service catalog; the gateway adds no queue
//! semantics of its own.

pub mod access;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod ws;

pub use error::ApiError;
pub use server::{router, serve, GatewayState};
