// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Linewise integration tests.
//!
//! Provides an assembled coordinator stack and collaborator doubles for
//! fast, deterministic tests without external services.
//!
//! # Components
//!
//! - [`TestHarness`] - Temp SQLite store, memory cache, hub and coordinator
//! - [`TestSession`] - In-memory transport driving a real hub connection
//! - [`StaticAuthenticator`] / [`StaticCatalog`] - Fixed collaborator answers

pub mod doubles;
pub mod harness;
pub mod session;

pub use doubles::{StaticAuthenticator, StaticCatalog};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use session::TestSession;
