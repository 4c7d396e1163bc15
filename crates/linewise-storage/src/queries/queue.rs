// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue entry operations: position assignment and version-checked transitions.

use std::str::FromStr;

use linewise_core::types::now_timestamp;
use linewise_core::{LinewiseError, NewQueueEntry, Page, QueueEntry, QueueStatus, StatusChange};
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};

const SELECT_ENTRY: &str = "SELECT id, client_id, institution_id, service_id, employee_id,
            position, status, version, created_at, updated_at
     FROM queue_entries";

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    let status: String = row.get(6)?;
    let status = QueueStatus::from_str(&status).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(QueueEntry {
        id: row.get(0)?,
        client_id: row.get(1)?,
        institution_id: row.get(2)?,
        service_id: row.get(3)?,
        employee_id: row.get(4)?,
        position: row.get(5)?,
        status,
        version: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn select_by_id(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<QueueEntry>> {
    conn.query_row(&format!("{SELECT_ENTRY} WHERE id = ?1"), params![id], row_to_entry)
        .optional()
}

fn select_active(
    conn: &rusqlite::Connection,
    client_id: i64,
    service_id: i64,
) -> rusqlite::Result<Option<QueueEntry>> {
    conn.query_row(
        &format!(
            "{SELECT_ENTRY}
             WHERE client_id = ?1 AND service_id = ?2
               AND status NOT IN ('completed', 'cancelled')
             ORDER BY id DESC
             LIMIT 1"
        ),
        params![client_id, service_id],
        row_to_entry,
    )
    .optional()
}

/// Return the client's active entry for the service, or insert a pending one
/// at the service's next position. The flag is true when a row was inserted.
///
/// The lookup, the position sequence row and the insert share one transaction
/// on the single writer thread. Concurrent joins by one client therefore
/// yield one row, and two joins never draw the same position.
pub async fn join_entry(
    db: &Database,
    entry: &NewQueueEntry,
) -> Result<(QueueEntry, bool), LinewiseError> {
    let entry = entry.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            if let Some(existing) = select_active(&tx, entry.client_id, entry.service_id)? {
                return Ok((existing, false));
            }
            // Seeded from existing rows so a fresh sequence never undercuts them.
            tx.execute(
                "INSERT INTO service_positions (service_id, last_position)
                 VALUES (?1, COALESCE((SELECT MAX(position) FROM queue_entries WHERE service_id = ?1), 0) + 1)
                 ON CONFLICT (service_id) DO UPDATE SET last_position = last_position + 1",
                params![entry.service_id],
            )?;
            let position: i64 = tx.query_row(
                "SELECT last_position FROM service_positions WHERE service_id = ?1",
                params![entry.service_id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO queue_entries
                    (client_id, institution_id, service_id, position, status, version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', 1, ?5, ?5)",
                params![
                    entry.client_id,
                    entry.institution_id,
                    entry.service_id,
                    position,
                    now
                ],
            )?;
            let id = tx.last_insert_rowid();
            let inserted = tx.query_row(
                &format!("{SELECT_ENTRY} WHERE id = ?1"),
                params![id],
                row_to_entry,
            )?;
            tx.commit()?;
            Ok((inserted, true))
        })
        .await
        .map_err(map_tr_err)
}

/// The pending entry with the lowest position.
pub async fn next_waiting(db: &Database, service_id: i64) -> Result<Option<QueueEntry>, LinewiseError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "{SELECT_ENTRY}
                     WHERE service_id = ?1 AND status = 'pending'
                     ORDER BY position ASC
                     LIMIT 1"
                ),
                params![service_id],
                row_to_entry,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one entry by id.
pub async fn get_entry(db: &Database, id: i64) -> Result<Option<QueueEntry>, LinewiseError> {
    db.connection()
        .call(move |conn| select_by_id(conn, id))
        .await
        .map_err(map_tr_err)
}

/// Outcome of a conditional update, resolved on the writer thread.
enum Applied {
    Updated(QueueEntry),
    Missing,
    Stale,
}

/// Apply a status change with `WHERE id = ? AND version = ? AND status = ?`.
///
/// Zero affected rows means either the entry is gone (`NotFound`) or it
/// moved on from the version and status the caller validated against
/// (`ConcurrentUpdate`).
pub async fn apply_status(db: &Database, change: &StatusChange) -> Result<QueueEntry, LinewiseError> {
    let change = change.clone();
    let now = now_timestamp();
    let applied = db
        .connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE queue_entries
                 SET status = ?1,
                     employee_id = COALESCE(?2, employee_id),
                     version = version + 1,
                     updated_at = ?3
                 WHERE id = ?4 AND version = ?5 AND status = ?6",
                params![
                    change.status.to_string(),
                    change.employee_id,
                    now,
                    change.entry_id,
                    change.expected_version,
                    change.expected_status.to_string()
                ],
            )?;
            if affected == 1 {
                return match select_by_id(conn, change.entry_id)? {
                    Some(entry) => Ok(Applied::Updated(entry)),
                    None => Ok(Applied::Missing),
                };
            }
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM queue_entries WHERE id = ?1)",
                params![change.entry_id],
                |row| row.get(0),
            )?;
            Ok(if exists { Applied::Stale } else { Applied::Missing })
        })
        .await
        .map_err(map_tr_err)?;

    match applied {
        Applied::Updated(entry) => Ok(entry),
        Applied::Missing => Err(LinewiseError::NotFound(format!(
            "queue entry {}",
            change.entry_id
        ))),
        Applied::Stale => Err(LinewiseError::ConcurrentUpdate {
            id: change.entry_id,
            expected_version: change.expected_version,
        }),
    }
}

/// Number of pending entries for a service.
pub async fn count_waiting(db: &Database, service_id: i64) -> Result<i64, LinewiseError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM queue_entries WHERE service_id = ?1 AND status = 'pending'",
                params![service_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// One page (1-based) of an institution's entries, ordered by service then position.
pub async fn list_for_institution(
    db: &Database,
    institution_id: i64,
    page: u32,
    page_size: u32,
) -> Result<Page<QueueEntry>, LinewiseError> {
    let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
    let limit = i64::from(page_size);
    let (items, total) = db
        .connection()
        .call(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue_entries WHERE institution_id = ?1",
                params![institution_id],
                |row| row.get(0),
            )?;
            let mut stmt = conn.prepare(&format!(
                "{SELECT_ENTRY}
                 WHERE institution_id = ?1
                 ORDER BY service_id ASC, position ASC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let items = stmt
                .query_map(params![institution_id, limit, offset], row_to_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((items, total))
        })
        .await
        .map_err(map_tr_err)?;

    Ok(Page {
        items,
        total,
        page,
        page_size,
    })
}

/// Delete all entries of an institution and return the services they belonged to.
pub async fn delete_for_institution(db: &Database, institution_id: i64) -> Result<Vec<i64>, LinewiseError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let services = {
                let mut stmt = tx.prepare(
                    "SELECT DISTINCT service_id FROM queue_entries
                     WHERE institution_id = ?1 ORDER BY service_id",
                )?;
                stmt.query_map(params![institution_id], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<i64>>>()?
            };
            tx.execute(
                "DELETE FROM queue_entries WHERE institution_id = ?1",
                params![institution_id],
            )?;
            tx.commit()?;
            Ok(services)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete one entry, returning it if it existed.
pub async fn delete_entry(db: &Database, id: i64) -> Result<Option<QueueEntry>, LinewiseError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let entry = select_by_id(&tx, id)?;
            if entry.is_some() {
                tx.execute("DELETE FROM queue_entries WHERE id = ?1", params![id])?;
            }
            tx.commit()?;
            Ok(entry)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn join(client_id: i64, service_id: i64) -> NewQueueEntry {
        NewQueueEntry {
            client_id,
            institution_id: 3,
            service_id,
        }
    }

    async fn insert_entry(db: &Database, entry: &NewQueueEntry) -> Result<QueueEntry, LinewiseError> {
        join_entry(db, entry).await.map(|(entry, _)| entry)
    }

    fn change(entry: &QueueEntry, status: QueueStatus) -> StatusChange {
        StatusChange {
            entry_id: entry.id,
            expected_version: entry.version,
            expected_status: entry.status,
            status,
            employee_id: None,
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_positions_per_service() {
        let db = setup_db().await;

        let a = insert_entry(&db, &join(1, 7)).await.unwrap();
        let b = insert_entry(&db, &join(2, 7)).await.unwrap();
        let other = insert_entry(&db, &join(3, 8)).await.unwrap();

        assert_eq!(a.position, 1);
        assert_eq!(b.position, 2);
        assert_eq!(other.position, 1, "positions are per service");
        assert_eq!(a.status, QueueStatus::Pending);
        assert_eq!(a.version, 1);
        assert!(a.employee_id.is_none());
    }

    #[tokio::test]
    async fn positions_are_not_reused_after_delete() {
        let db = setup_db().await;

        insert_entry(&db, &join(1, 7)).await.unwrap();
        let last = insert_entry(&db, &join(2, 7)).await.unwrap();
        delete_entry(&db, last.id).await.unwrap();

        let next = insert_entry(&db, &join(3, 7)).await.unwrap();
        assert_eq!(next.position, 3);
    }

    #[tokio::test]
    async fn apply_status_bumps_version_and_attaches_employee() {
        let db = setup_db().await;
        let entry = insert_entry(&db, &join(1, 7)).await.unwrap();

        let called = apply_status(
            &db,
            &StatusChange {
                employee_id: Some(42),
                ..change(&entry, QueueStatus::Called)
            },
        )
        .await
        .unwrap();

        assert_eq!(called.status, QueueStatus::Called);
        assert_eq!(called.version, entry.version + 1);
        assert_eq!(called.employee_id, Some(42));
        assert_eq!(called.position, entry.position);

        // Employee survives a later change that does not name one.
        let done = apply_status(&db, &change(&called, QueueStatus::Completed))
            .await
            .unwrap();
        assert_eq!(done.employee_id, Some(42));
    }

    #[tokio::test]
    async fn stale_version_is_a_concurrent_update() {
        let db = setup_db().await;
        let entry = insert_entry(&db, &join(1, 7)).await.unwrap();

        apply_status(&db, &change(&entry, QueueStatus::Called))
            .await
            .unwrap();
        let err = apply_status(&db, &change(&entry, QueueStatus::Cancelled))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LinewiseError::ConcurrentUpdate { id, expected_version: 1 } if id == entry.id
        ));
    }

    #[tokio::test]
    async fn apply_status_on_missing_entry_is_not_found() {
        let db = setup_db().await;
        let err = apply_status(
            &db,
            &StatusChange {
                entry_id: 999,
                expected_version: 1,
                expected_status: QueueStatus::Pending,
                status: QueueStatus::Called,
                employee_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LinewiseError::NotFound(_)));
    }

    #[tokio::test]
    async fn join_returns_the_active_entry_instead_of_inserting() {
        let db = setup_db().await;
        let (first, created) = join_entry(&db, &join(1, 7)).await.unwrap();
        assert!(created);

        let (again, created) = join_entry(&db, &join(1, 7)).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, first.id);
        assert_eq!(count_waiting(&db, 7).await.unwrap(), 1);

        // A terminal entry no longer counts as active.
        apply_status(&db, &change(&first, QueueStatus::Cancelled))
            .await
            .unwrap();
        let (second, created) = join_entry(&db, &join(1, 7)).await.unwrap();
        assert!(created);
        assert_ne!(second.id, first.id);
        assert_eq!(second.position, 2);
    }

    #[tokio::test]
    async fn schema_rejects_a_second_active_entry() {
        let db = setup_db().await;
        insert_entry(&db, &join(1, 7)).await.unwrap();

        let result = db
            .connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO queue_entries (client_id, institution_id, service_id, position)
                     VALUES (1, 3, 7, 99)",
                    [],
                )
            })
            .await;
        assert!(result.is_err(), "unique index should reject a duplicate active entry");
    }

    #[tokio::test]
    async fn status_guard_rejects_a_moved_entry_even_at_the_same_version() {
        let db = setup_db().await;
        let entry = insert_entry(&db, &join(1, 7)).await.unwrap();

        let err = apply_status(
            &db,
            &StatusChange {
                expected_status: QueueStatus::Called,
                ..change(&entry, QueueStatus::InProgress)
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LinewiseError::ConcurrentUpdate { .. }));
        assert_eq!(
            get_entry(&db, entry.id).await.unwrap().unwrap().status,
            QueueStatus::Pending
        );
    }

    #[tokio::test]
    async fn next_waiting_is_lowest_pending_position() {
        let db = setup_db().await;
        let a = insert_entry(&db, &join(1, 7)).await.unwrap();
        let b = insert_entry(&db, &join(2, 7)).await.unwrap();

        assert_eq!(next_waiting(&db, 7).await.unwrap().unwrap().id, a.id);
        apply_status(&db, &change(&a, QueueStatus::Called))
            .await
            .unwrap();
        assert_eq!(next_waiting(&db, 7).await.unwrap().unwrap().id, b.id);
        assert_eq!(count_waiting(&db, 7).await.unwrap(), 1);
        assert!(next_waiting(&db, 8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_for_institution_pages_in_order() {
        let db = setup_db().await;
        for client in 1..=5 {
            insert_entry(&db, &join(client, 7)).await.unwrap();
        }
        insert_entry(
            &db,
            &NewQueueEntry {
                client_id: 9,
                institution_id: 4,
                service_id: 9,
            },
        )
        .await
        .unwrap();

        let page = list_for_institution(&db, 3, 2, 2).await.unwrap();
        assert_eq!(page.total, 5);
        let positions: Vec<_> = page.items.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![3, 4]);
    }

    #[tokio::test]
    async fn delete_for_institution_reports_services() {
        let db = setup_db().await;
        insert_entry(&db, &join(1, 7)).await.unwrap();
        insert_entry(&db, &join(2, 8)).await.unwrap();
        insert_entry(&db, &join(3, 8)).await.unwrap();

        let services = delete_for_institution(&db, 3).await.unwrap();
        assert_eq!(services, vec![7, 8]);
        assert_eq!(count_waiting(&db, 8).await.unwrap(), 0);
        assert!(delete_for_institution(&db, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_joins_by_one_client_share_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("same_client.db");
        let db = std::sync::Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = std::sync::Arc::clone(&db);
                tokio::spawn(async move { join_entry(&db, &join(1, 7)).await })
            })
            .collect();

        let mut ids = Vec::new();
        let mut created = 0;
        for handle in handles {
            let (entry, inserted) = handle.await.unwrap().unwrap();
            ids.push(entry.id);
            created += usize::from(inserted);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(created, 1);
        assert_eq!(count_waiting(&db, 7).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_joins_draw_unique_positions() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("concurrent.db");
        let db = std::sync::Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());

        let handles: Vec<_> = (1..=20)
            .map(|client| {
                let db = std::sync::Arc::clone(&db);
                tokio::spawn(async move { insert_entry(&db, &join(client, 7)).await })
            })
            .collect();

        let mut positions = Vec::new();
        for handle in handles {
            positions.push(handle.await.unwrap().unwrap().position);
        }
        positions.sort_unstable();
        assert_eq!(positions, (1..=20).collect::<Vec<_>>());
    }
}
