// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits at the seams between the coordinator and its collaborators.

pub mod cache;
pub mod remote;
pub mod store;

pub use cache::LengthCache;
pub use remote::{Authenticator, ServiceCatalog};
pub use store::QueueStore;
