// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket session routes.
//!
//! Access checks run before the upgrade so they surface as HTTP statuses.
//! The hub registration happens after it, so an upgrade that never completes
//! leaves nothing behind in the registry.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Extension;
use futures::{future, SinkExt, StreamExt};
use tracing::{debug, warn};

use linewise_core::{AuthenticatedUser, LinewiseError};
use linewise_hub::{Connection, Frame};

use crate::access::{require_client, require_staff_of};
use crate::error::ApiError;
use crate::server::GatewayState;

/// GET /queue/join/{serviceId}
pub async fn join(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(service_id): Path<i64>,
) -> Result<Response, ApiError> {
    require_client(&user)?;
    let service = state.catalog.service(service_id).await?;
    Ok(ws.on_upgrade(move |socket| async move {
        let opened = state
            .coordinator
            .open_session(user.user_id, service.institution_id, service_id)
            .await
            .map(|(connection, joined)| {
                debug!(
                    client_id = user.user_id,
                    service_id,
                    position = joined.entry.position,
                    created = joined.created,
                    "session opened"
                );
                connection
            });
        serve_socket(socket, opened).await;
    }))
}

/// GET /queue/watch/{serviceId}
pub async fn watch(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(service_id): Path<i64>,
) -> Result<Response, ApiError> {
    let service = state.catalog.service(service_id).await?;
    require_staff_of(&user, service.institution_id)?;
    Ok(ws.on_upgrade(move |socket| async move {
        let opened = state
            .coordinator
            .watch_session(user.user_id, service_id)
            .await;
        serve_socket(socket, opened).await;
    }))
}

async fn serve_socket(mut socket: WebSocket, opened: Result<Connection, LinewiseError>) {
    let connection = match opened {
        Ok(connection) => connection,
        Err(e) => {
            warn!(error = %e, "failed to open session");
            let close = Message::Close(Some(CloseFrame {
                code: close_code::ERROR,
                reason: "session unavailable".into(),
            }));
            if let Err(e) = socket.send(close).await {
                debug!(error = %e, "failed to send close frame");
            }
            return;
        }
    };

    let (sink, stream) = socket.split();
    let inbound = stream.map(|message| message.map(frame_from_message));
    let outbound = sink.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text.into()))));
    connection.run(inbound, outbound).await;
}

/// Reduce an axum message to what the session protocol cares about.
pub fn frame_from_message(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Close(Some(frame)) => Frame::Close(Some(frame.code)),
        Message::Close(None) => Frame::Close(None),
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => Frame::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_relayed_verbatim() {
        assert_eq!(
            frame_from_message(Message::Text("hello".into())),
            Frame::Text("hello".into())
        );
    }

    #[test]
    fn close_code_is_kept() {
        let close = Message::Close(Some(CloseFrame {
            code: close_code::AWAY,
            reason: "".into(),
        }));
        assert_eq!(frame_from_message(close), Frame::Close(Some(1001)));
        assert_eq!(frame_from_message(Message::Close(None)), Frame::Close(None));
    }

    #[test]
    fn control_frames_are_ignored() {
        assert_eq!(frame_from_message(Message::Ping(Default::default())), Frame::Other);
        assert_eq!(
            frame_from_message(Message::Binary(vec![1, 2].into())),
            Frame::Other
        );
    }
}
