// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory transport for driving a [`Connection`] in tests.
//!
//! Frames are pushed through an unbounded channel standing in for the
//! socket's read half; everything the connection writes is captured on the
//! other side for assertions.

use std::time::Duration;

use futures::channel::mpsc;
use futures::StreamExt;
use linewise_core::QueueEvent;
use linewise_hub::{Connection, Frame};
use tokio::task::JoinHandle;

/// How long helpers wait for a frame before giving up.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// A running connection attached to in-memory pipes.
pub struct TestSession {
    inbound: mpsc::UnboundedSender<Result<Frame, String>>,
    outbound: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<()>,
}

impl TestSession {
    /// Spawn the connection's loops over fresh pipes.
    pub fn start(connection: Connection) -> Self {
        let (inbound, inbound_rx) = mpsc::unbounded();
        let (outbound_tx, outbound) = mpsc::unbounded();
        let task = tokio::spawn(connection.run(inbound_rx, outbound_tx));
        Self {
            inbound,
            outbound,
            task,
        }
    }

    /// Send a client text frame.
    pub fn send_text(&self, text: &str) {
        let _ = self.inbound.unbounded_send(Ok(Frame::Text(text.to_string())));
    }

    /// Send a close frame with the given code.
    pub fn close(&self, code: Option<u16>) {
        let _ = self.inbound.unbounded_send(Ok(Frame::Close(code)));
    }

    /// Make the transport fail.
    pub fn fail(&self, reason: &str) {
        let _ = self.inbound.unbounded_send(Err(reason.to_string()));
    }

    /// Next decoded event, or `None` when the transport closed or nothing
    /// arrived within [`FRAME_TIMEOUT`].
    pub async fn next_event(&mut self) -> Option<QueueEvent> {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, self.outbound.next())
            .await
            .ok()??;
        serde_json::from_str(&frame).ok()
    }

    /// Next event; panics if none arrives.
    pub async fn expect_event(&mut self) -> QueueEvent {
        self.next_event()
            .await
            .expect("expected an outbound event")
    }

    /// True if no frame arrives within `window`.
    pub async fn is_silent_for(&mut self, window: Duration) -> bool {
        tokio::time::timeout(window, self.outbound.next())
            .await
            .is_err()
    }

    /// True once the connection has closed its side of the transport.
    pub async fn is_closed(&mut self) -> bool {
        loop {
            match tokio::time::timeout(FRAME_TIMEOUT, self.outbound.next()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return true,
                Err(_) => return false,
            }
        }
    }

    /// Wait for the connection task to finish.
    pub async fn finished(self) {
        drop(self.inbound);
        let _ = tokio::time::timeout(FRAME_TIMEOUT, self.task).await;
    }
}
