// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP clients for the remote collaborators of the Linewise queue service.
//!
//! Both clients translate remote status codes into the shared error taxonomy
//! at the call boundary, so callers never see transport details.

pub mod auth;
pub mod catalog;
mod http;

pub use auth::HttpAuthenticator;
pub use catalog::HttpCatalog;
