//! WebSocket client for one chat server connection.
//!
//! Chat commands are written straight to the outbound queue; chunked
//! payloads go through the session task, which owns all transfer state.

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::info;

use roomcast_protocol::Frame;
use roomcast_protocol::constants::WS_MAX_MESSAGE_SIZE;
use roomcast_protocol::messages::{ChatText, Login, PrivateText, RoomRef};
use roomcast_transfer::SentTransfer;

use crate::error::ClientError;
use crate::pumps::write::FrameWriter;
use crate::session::{Command, Session, run_session};
use crate::types::{ClientEvent, SessionOptions};

/// Capacity of the inbound frame and event queues.
const QUEUE_CAPACITY: usize = 256;

/// A logged-in connection to the chat server.
///
/// Events arrive on the receiver returned by [`RoomClient::connect`];
/// the last one is always [`ClientEvent::Disconnected`].
pub struct RoomClient {
    identity: String,
    writer: FrameWriter,
    cmd_tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
    _session_handle: tokio::task::JoinHandle<()>,
}

impl RoomClient {
    /// Connects with default transfer options and logs in as `identity`.
    pub async fn connect(
        url: &str,
        identity: &str,
    ) -> Result<(Self, mpsc::Receiver<ClientEvent>), ClientError> {
        Self::connect_with(url, identity, SessionOptions::default()).await
    }

    /// Connects and logs in as `identity`.
    pub async fn connect_with(
        url: &str,
        identity: &str,
        options: SessionOptions,
    ) -> Result<(Self, mpsc::Receiver<ClientEvent>), ClientError> {
        let mut ws_config = tokio_tungstenite::tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false).await?;
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel::<Frame>(QUEUE_CAPACITY);
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(16);
        let (events_tx, events_rx) = mpsc::channel::<ClientEvent>(QUEUE_CAPACITY);
        let cancel = CancellationToken::new();
        let writer = FrameWriter::new(write_tx.clone());

        let write_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::write::write_pump(write, write_rx, cancel))
        };

        let read_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::read::read_pump(
                read, inbound_tx, write_tx, cancel,
            ))
        };

        let session_handle = tokio::spawn(run_session(
            Session::new(identity, &options),
            inbound_rx,
            cmd_rx,
            writer.clone(),
            events_tx,
            cancel.clone(),
        ));

        let client = Self {
            identity: identity.to_string(),
            writer,
            cmd_tx,
            cancel,
            _read_handle: read_handle,
            _write_handle: write_handle,
            _session_handle: session_handle,
        };

        client.send(&Frame::Login(Login {
            username: identity.to_string(),
        }))?;
        info!(url, username = identity, "connected");

        Ok((client, events_rx))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Queues any frame for sending.
    pub fn send(&self, frame: &Frame) -> Result<(), ClientError> {
        self.writer.send(frame)
    }

    pub fn create_room(&self, room: &str) -> Result<(), ClientError> {
        self.send(&Frame::CreateRoom(room_ref(room)))
    }

    pub fn join_room(&self, room: &str) -> Result<(), ClientError> {
        self.send(&Frame::JoinRoom(room_ref(room)))
    }

    pub fn leave_room(&self, room: &str) -> Result<(), ClientError> {
        self.send(&Frame::LeaveRoom(room_ref(room)))
    }

    pub fn send_text(&self, room: &str, content: &str) -> Result<(), ClientError> {
        self.send(&Frame::Message(self.chat(room, content)))
    }

    pub fn send_sticker(&self, room: &str, sticker: &str) -> Result<(), ClientError> {
        self.send(&Frame::Sticker(self.chat(room, sticker)))
    }

    pub fn send_private(&self, room: &str, to: &str, content: &str) -> Result<(), ClientError> {
        self.send(&Frame::PrivateMessage(PrivateText {
            room: room.to_string(),
            to: to.to_string(),
            from: self.identity.clone(),
            content: content.to_string(),
        }))
    }

    /// Sends `payload` to `room` as a chunked transfer.
    ///
    /// Resolves once every frame is queued; delivery is reported through
    /// [`ClientEvent::AckProgress`].
    pub async fn send_payload(
        &self,
        room: &str,
        payload_name: &str,
        payload_kind: &str,
        payload: Vec<u8>,
    ) -> Result<SentTransfer, ClientError> {
        let (reply, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SendPayload {
                room: room.to_string(),
                payload_name: payload_name.to_string(),
                payload_kind: payload_kind.to_string(),
                payload,
                reply,
            })
            .await
            .map_err(|_| ClientError::Closed)?;
        reply_rx.await.map_err(|_| ClientError::Closed)?
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Gracefully closes the connection. The session still emits its
    /// final events.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    fn chat(&self, room: &str, content: &str) -> ChatText {
        ChatText {
            room: room.to_string(),
            from: self.identity.clone(),
            content: content.to_string(),
        }
    }
}

fn room_ref(room: &str) -> RoomRef {
    RoomRef {
        room: room.to_string(),
    }
}

impl Drop for RoomClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        self._read_handle.abort();
        self._write_handle.abort();
    }
}
