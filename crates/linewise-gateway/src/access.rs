// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Who may do what.
//!
//! Staff act only on their own institution; admins act on any. Clients join
//! queues and may cancel their own entry.

use linewise_core::{AuthenticatedUser, LinewiseError, QueueEntry, QueueStatus, UserType};

/// The caller must be staff of `institution_id` (or an admin).
pub fn require_staff_of(user: &AuthenticatedUser, institution_id: i64) -> Result<(), LinewiseError> {
    match user.user_type {
        UserType::Admin => Ok(()),
        UserType::Staff if user.institution_id == Some(institution_id) => Ok(()),
        UserType::Staff => Err(LinewiseError::Forbidden(format!(
            "user {} does not belong to institution {institution_id}",
            user.user_id
        ))),
        UserType::Client => Err(LinewiseError::Forbidden(format!(
            "user {} is not staff",
            user.user_id
        ))),
    }
}

/// The caller must be a client account.
pub fn require_client(user: &AuthenticatedUser) -> Result<(), LinewiseError> {
    if user.user_type == UserType::Client {
        Ok(())
    } else {
        Err(LinewiseError::Forbidden(format!(
            "user {} cannot join a queue",
            user.user_id
        )))
    }
}

/// Staff of the entry's institution may apply any status; the owning client
/// may only cancel.
pub fn require_can_update(
    user: &AuthenticatedUser,
    entry: &QueueEntry,
    status: QueueStatus,
) -> Result<(), LinewiseError> {
    if user.user_type == UserType::Client {
        return if entry.client_id == user.user_id && status == QueueStatus::Cancelled {
            Ok(())
        } else {
            Err(LinewiseError::Forbidden(format!(
                "user {} may not set queue entry {} to {status}",
                user.user_id, entry.id
            )))
        };
    }
    require_staff_of(user, entry.institution_id)
}
