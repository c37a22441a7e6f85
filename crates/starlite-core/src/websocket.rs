//! WebSocket connections over the ASGI event channel.

use starlite_router::PathParams;

use crate::asgi::{Message, ReceiveEvent, Scope, SendEvent, SharedReceiver, SharedSender};
use crate::error::{Error, WebSocketError};
use crate::headers::Headers;

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// A WebSocket connection handed to WebSocket route handlers.
pub struct WebSocket {
    scope: Scope,
    receive: SharedReceiver,
    send: SharedSender,
    accepted: bool,
    closed: bool,
}

impl std::fmt::Debug for WebSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocket")
            .field("path", &self.scope.path)
            .field("accepted", &self.accepted)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl WebSocket {
    /// Wrap a WebSocket scope and its channels.
    #[must_use]
    pub fn new(scope: Scope, receive: SharedReceiver, send: SharedSender) -> Self {
        Self {
            scope,
            receive,
            send,
            accepted: false,
            closed: false,
        }
    }

    /// The underlying scope.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Converted path parameters.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.scope.path_params
    }

    /// Returns `true` once [`WebSocket::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Wait for `websocket.connect` and accept the connection.
    pub async fn accept(&mut self) -> Result<(), Error> {
        self.accept_with_headers(Headers::new()).await
    }

    /// Accept the connection with extra handshake headers.
    pub async fn accept_with_headers(&mut self, headers: Headers) -> Result<(), Error> {
        match self.receive.receive().await? {
            ReceiveEvent::WebSocketConnect => {}
            ReceiveEvent::WebSocketDisconnect { .. } => return Err(Error::Disconnected),
            other => {
                return Err(WebSocketError::new(
                    1002,
                    format!("expected websocket.connect, got {}", other.event_type()),
                )
                .into());
            }
        }
        self.send.send(SendEvent::WebSocketAccept { headers }).await?;
        self.accepted = true;
        Ok(())
    }

    /// Receive the next message.
    ///
    /// Returns `Ok(None)` when the client disconnects.
    pub async fn receive(&mut self) -> Result<Option<Message>, Error> {
        loop {
            match self.receive.receive().await? {
                ReceiveEvent::WebSocketReceive(message) => return Ok(Some(message)),
                ReceiveEvent::WebSocketDisconnect { code } => {
                    tracing::debug!(code, path = %self.scope.path, "websocket client disconnected");
                    self.closed = true;
                    return Ok(None);
                }
                other => {
                    tracing::trace!(event = other.event_type(), "ignoring websocket event");
                }
            }
        }
    }

    /// Receive the next text message; binary frames are an error.
    pub async fn receive_text(&mut self) -> Result<Option<String>, Error> {
        match self.receive().await? {
            Some(Message::Text(text)) => Ok(Some(text)),
            Some(Message::Bytes(_)) => Err(WebSocketError::new(1003, "expected a text frame").into()),
            None => Ok(None),
        }
    }

    /// Send a message.
    pub async fn send(&mut self, message: Message) -> Result<(), Error> {
        if !self.accepted {
            return Err(Error::internal("websocket message sent before accept"));
        }
        self.send.send(SendEvent::WebSocketSend(message)).await
    }

    /// Send a text message.
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), Error> {
        self.send(Message::Text(text.into())).await
    }

    /// Send a binary message.
    pub async fn send_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> Result<(), Error> {
        self.send(Message::Bytes(bytes.into())).await
    }

    /// Close the connection.
    pub async fn close(&mut self, code: u16, reason: impl Into<String>) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.send
            .send(SendEvent::WebSocketClose {
                code,
                reason: reason.into(),
            })
            .await
    }
}
