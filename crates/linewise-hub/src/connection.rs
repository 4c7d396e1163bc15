// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One live session bridged to the hub.
//!
//! A connection registers its member into a subject room (and optionally a
//! private room), then runs two loops:
//!
//! - inbound: reads frames from the transport; text becomes a `received`
//!   event for the subject room, an abnormal close becomes `disconnected`.
//! - outbound: drains the bounded outbound queue into the transport as JSON
//!   text frames.
//!
//! The transport is any `Stream` of [`Frame`]s plus any `Sink<String>`, so
//! WebSockets and in-memory test pipes share this code.

use std::fmt::Display;
use std::sync::Arc;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use linewise_core::{EventStatus, LinewiseError, QueueEvent, RoomKey};

use crate::hub::{HubHandle, Member, SessionId};

/// Close codes that end a session normally (RFC 6455 normal closure, going away).
const NORMAL_CLOSE_CODES: [u16; 2] = [1000, 1001];

/// An inbound transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Opaque client text.
    Text(String),
    /// Close frame with its status code, if the peer sent one.
    Close(Option<u16>),
    /// Ping, pong and binary frames; ignored.
    Other,
}

/// Why the inbound loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Exit {
    Normal,
    Abnormal(String),
}

/// A registered session, ready to run.
pub struct Connection {
    hub: HubHandle,
    session: SessionId,
    member_id: i64,
    subject: RoomKey,
    private: Option<RoomKey>,
    outbox: broadcast::Receiver<Arc<str>>,
    cancel: CancellationToken,
}

impl Connection {
    /// Register `member_id` into `subject` (and `private`, if given) under a
    /// new session.
    ///
    /// Registration has completed when this returns, so a broadcast issued
    /// afterwards reaches the new session.
    pub async fn open(
        hub: HubHandle,
        member_id: i64,
        subject: RoomKey,
        private: Option<RoomKey>,
    ) -> Result<Self, LinewiseError> {
        let session = Uuid::new_v4();
        // The hub holds the only senders, so evicting every slot closes the queue.
        let (tx, outbox) = hub.outbox();
        for room in std::iter::once(subject).chain(private) {
            hub.register(Member {
                id: member_id,
                session,
                room,
                outbox: tx.clone(),
            })
            .await?;
        }
        drop(tx);

        debug!(%session, member_id, %subject, "connection registered");
        Ok(Self {
            hub,
            session,
            member_id,
            subject,
            private,
            outbox,
            cancel: CancellationToken::new(),
        })
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn member_id(&self) -> i64 {
        self.member_id
    }

    pub fn subject(&self) -> RoomKey {
        self.subject
    }

    /// Drive the session until the peer leaves or the outbound queue closes.
    ///
    /// Always unregisters from every joined room before returning.
    pub async fn run<St, E, Si>(self, inbound: St, outbound: Si)
    where
        St: Stream<Item = Result<Frame, E>> + Unpin + Send,
        E: Display,
        Si: Sink<String> + Unpin + Send + 'static,
        Si::Error: Display,
    {
        let Connection {
            hub,
            session,
            member_id,
            subject,
            private,
            outbox,
            cancel,
        } = self;

        let writer = tokio::spawn(outbound_loop(outbox, outbound, session, cancel.clone()));

        let exit = tokio::select! {
            exit = inbound_loop(inbound, &hub, subject, member_id) => exit,
            // The writer stopped first: queue closed by eviction or a failed write.
            _ = cancel.cancelled() => Exit::Normal,
        };

        if let Exit::Abnormal(reason) = &exit {
            info!(%session, member_id, %subject, reason = %reason, "connection closed abnormally");
            let event = QueueEvent::new(EventStatus::Disconnected, subject, member_id);
            if let Err(e) = hub.broadcast(subject, &event).await {
                warn!(%session, error = %e, "failed to announce disconnect");
            }
        }

        for room in std::iter::once(subject).chain(private) {
            if let Err(e) = hub.unregister(room, member_id, Some(session)).await {
                warn!(%session, %room, error = %e, "failed to unregister connection");
            }
        }

        cancel.cancel();
        if let Err(e) = writer.await {
            warn!(%session, error = %e, "outbound task failed");
        }
        debug!(%session, member_id, ?exit, "connection finished");
    }
}

async fn inbound_loop<St, E>(mut inbound: St, hub: &HubHandle, subject: RoomKey, member_id: i64) -> Exit
where
    St: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Frame::Text(text)) => {
                let event =
                    QueueEvent::new(EventStatus::Received, subject, member_id).with_content(text);
                if let Err(e) = hub.broadcast(subject, &event).await {
                    return Exit::Abnormal(e.to_string());
                }
            }
            Ok(Frame::Close(None)) => return Exit::Normal,
            Ok(Frame::Close(Some(code))) if NORMAL_CLOSE_CODES.contains(&code) => return Exit::Normal,
            Ok(Frame::Close(Some(code))) => return Exit::Abnormal(format!("close code {code}")),
            Ok(Frame::Other) => {}
            Err(e) => return Exit::Abnormal(e.to_string()),
        }
    }
    Exit::Normal
}

async fn outbound_loop<Si>(
    mut outbox: broadcast::Receiver<Arc<str>>,
    mut outbound: Si,
    session: SessionId,
    cancel: CancellationToken,
) where
    Si: Sink<String> + Unpin,
    Si::Error: Display,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            message = outbox.recv() => match message {
                Ok(payload) => {
                    if let Err(e) = outbound.send(payload.to_string()).await {
                        debug!(%session, error = %e, "outbound write failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%session, skipped, "outbound queue full, dropped oldest messages");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(%session, "outbound queue closed");
                    break;
                }
            },
        }
    }
    if let Err(e) = outbound.close().await {
        debug!(%session, error = %e, "closing transport failed");
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::channel::mpsc;
    use linewise_config::model::HubConfig;
    use tokio::task::JoinHandle;
    use tracing_test::traced_test;

    use super::*;
    use crate::Hub;

    type Inbound = mpsc::UnboundedSender<Result<Frame, String>>;
    type Outbound = mpsc::UnboundedReceiver<String>;

    fn spawn_hub(outbound_capacity: usize) -> (HubHandle, CancellationToken) {
        let cancel = CancellationToken::new();
        let config = HubConfig {
            outbound_capacity,
            ..HubConfig::default()
        };
        let (hub, _task) = Hub::spawn(&config, cancel.clone());
        (hub, cancel)
    }

    async fn connect(
        hub: &HubHandle,
        member_id: i64,
        subject: RoomKey,
        private: Option<RoomKey>,
    ) -> (Inbound, Outbound, JoinHandle<()>) {
        let conn = Connection::open(hub.clone(), member_id, subject, private)
            .await
            .unwrap();
        let (in_tx, in_rx) = mpsc::unbounded();
        let (out_tx, out_rx) = mpsc::unbounded();
        let task = tokio::spawn(conn.run(in_rx, out_tx));
        (in_tx, out_rx, task)
    }

    async fn next_event(out: &mut Outbound) -> QueueEvent {
        let frame = tokio::time::timeout(Duration::from_secs(1), out.next())
            .await
            .expect("frame should arrive")
            .expect("transport open");
        serde_json::from_str(&frame).unwrap()
    }

    async fn finish(task: JoinHandle<()>) {
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("connection should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn text_frames_are_rebroadcast_as_received() {
        let (hub, _cancel) = spawn_hub(10);
        let (client_in, mut client_out, _c) = connect(&hub, 1, RoomKey::Service(7), None).await;
        let (_staff_in, mut staff_out, _s) = connect(&hub, 50, RoomKey::Service(7), None).await;

        client_in.unbounded_send(Ok(Frame::Text("hi".into()))).unwrap();

        for out in [&mut client_out, &mut staff_out] {
            let event = next_event(out).await;
            assert_eq!(event.status, EventStatus::Received);
            assert_eq!(event.content.as_deref(), Some("hi"));
            assert_eq!(event.room_id, "7");
            assert_eq!(event.user_id, "1");
        }
    }

    #[tokio::test]
    async fn normal_close_unregisters_quietly() {
        let (hub, _cancel) = spawn_hub(10);
        let (client_in, _client_out, task) =
            connect(&hub, 1, RoomKey::Service(7), Some(RoomKey::Client(1))).await;
        let (_staff_in, mut staff_out, _s) = connect(&hub, 50, RoomKey::Service(7), None).await;

        client_in.unbounded_send(Ok(Frame::Close(Some(1000)))).unwrap();
        finish(task).await;

        assert_eq!(hub.room_members(RoomKey::Service(7)).await.unwrap(), 1);
        assert_eq!(hub.room_members(RoomKey::Client(1)).await.unwrap(), 0);
        let quiet = tokio::time::timeout(Duration::from_millis(50), staff_out.next()).await;
        assert!(quiet.is_err(), "no disconnected event expected");
    }

    #[tokio::test]
    async fn end_of_stream_is_a_normal_close() {
        let (hub, _cancel) = spawn_hub(10);
        let (client_in, _client_out, task) = connect(&hub, 1, RoomKey::Service(7), None).await;

        drop(client_in);
        finish(task).await;
        assert_eq!(hub.stats(None).await.unwrap().rooms, 0);
    }

    #[tokio::test]
    async fn abnormal_close_announces_disconnect() {
        let (hub, _cancel) = spawn_hub(10);
        let (client_in, _client_out, task) = connect(&hub, 1, RoomKey::Service(7), None).await;
        let (_staff_in, mut staff_out, _s) = connect(&hub, 50, RoomKey::Service(7), None).await;

        client_in.unbounded_send(Ok(Frame::Close(Some(1006)))).unwrap();
        finish(task).await;

        let event = next_event(&mut staff_out).await;
        assert_eq!(event.status, EventStatus::Disconnected);
        assert_eq!(event.user_id, "1");
    }

    #[tokio::test]
    async fn transport_error_announces_disconnect() {
        let (hub, _cancel) = spawn_hub(10);
        let (client_in, _client_out, task) = connect(&hub, 1, RoomKey::Service(7), None).await;
        let (_staff_in, mut staff_out, _s) = connect(&hub, 50, RoomKey::Service(7), None).await;

        client_in.unbounded_send(Err("connection reset".into())).unwrap();
        finish(task).await;

        assert_eq!(next_event(&mut staff_out).await.status, EventStatus::Disconnected);
    }

    #[tokio::test]
    async fn eviction_closes_the_transport() {
        let (hub, _cancel) = spawn_hub(10);
        let (_client_in, mut client_out, task) =
            connect(&hub, 1, RoomKey::Service(7), Some(RoomKey::Client(1))).await;

        hub.unregister(RoomKey::Service(7), 1, None).await.unwrap();
        hub.unregister(RoomKey::Client(1), 1, None).await.unwrap();

        finish(task).await;
        let closed = tokio::time::timeout(Duration::from_secs(1), client_out.next())
            .await
            .unwrap();
        assert!(closed.is_none(), "sink should be closed after eviction");
    }

    #[tokio::test]
    #[traced_test]
    async fn slow_reader_drops_oldest_with_warning() {
        let (tx, rx) = broadcast::channel(2);
        for n in 0..5 {
            tx.send(Arc::from(n.to_string())).unwrap();
        }
        drop(tx);
        let (out_tx, out_rx) = mpsc::unbounded();

        outbound_loop(rx, out_tx, Uuid::new_v4(), CancellationToken::new()).await;

        let written: Vec<String> = out_rx.collect().await;
        assert_eq!(written, vec!["3", "4"]);
        assert!(logs_contain("dropped oldest messages"));
    }
}
