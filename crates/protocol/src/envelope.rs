use serde::{Deserialize, Serialize};

use crate::messages::{
    AudioAck, AudioChunk, AudioComplete, AudioStart, AudioUpload, ChatText, ErrorNotice, Login,
    PrivateText, RoomList, RoomRef, SystemNotice, UserList,
};

/// One frame on the chat channel, decoded once at the connection boundary.
///
/// The wire form is a flat JSON object whose `type` field names the
/// variant, e.g. `{"type":"audio_ack","transferId":"...","seq":0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Login(Login),
    LoginOk(Login),
    CreateRoom(RoomRef),
    JoinRoom(RoomRef),
    LeaveRoom(RoomRef),
    Message(ChatText),
    PrivateMessage(PrivateText),
    Sticker(ChatText),
    Audio(AudioUpload),
    System(SystemNotice),
    Rooms(RoomList),
    Users(UserList),
    Error(ErrorNotice),

    AudioStart(AudioStart),
    AudioChunk(AudioChunk),
    AudioComplete(AudioComplete),
    AudioAck(AudioAck),

    /// Forward compatibility: unknown frame types deserialize here.
    #[serde(other)]
    Unknown,
}

impl Frame {
    /// Serializes the frame to its JSON text form.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses one JSON text frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Login(_) => "login",
            Frame::LoginOk(_) => "login_ok",
            Frame::CreateRoom(_) => "create_room",
            Frame::JoinRoom(_) => "join_room",
            Frame::LeaveRoom(_) => "leave_room",
            Frame::Message(_) => "message",
            Frame::PrivateMessage(_) => "private_message",
            Frame::Sticker(_) => "sticker",
            Frame::Audio(_) => "audio",
            Frame::System(_) => "system",
            Frame::Rooms(_) => "rooms",
            Frame::Users(_) => "users",
            Frame::Error(_) => "error",
            Frame::AudioStart(_) => "audio_start",
            Frame::AudioChunk(_) => "audio_chunk",
            Frame::AudioComplete(_) => "audio_complete",
            Frame::AudioAck(_) => "audio_ack",
            Frame::Unknown => "unknown",
        }
    }

    /// Returns `true` for the four chunked transfer frames.
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            Frame::AudioStart(_) | Frame::AudioChunk(_) | Frame::AudioComplete(_) | Frame::AudioAck(_)
        )
    }

    /// The room that scopes delivery of this frame, if it names one.
    pub fn room(&self) -> Option<&str> {
        match self {
            Frame::CreateRoom(r) | Frame::JoinRoom(r) | Frame::LeaveRoom(r) => Some(&r.room),
            Frame::Message(m) | Frame::Sticker(m) => Some(&m.room),
            Frame::PrivateMessage(m) => Some(&m.room),
            Frame::Audio(a) => Some(&a.room),
            Frame::System(s) => s.room.as_deref(),
            Frame::Users(u) => Some(&u.room),
            Frame::AudioStart(s) => Some(&s.room),
            Frame::AudioComplete(c) => Some(&c.room),
            _ => None,
        }
    }
}
