use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session and room payloads
// ---------------------------------------------------------------------------

/// Identifies the client to the server (`login`, `login_ok`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Login {
    pub username: String,
}

/// Names a room (`create_room`, `join_room`, `leave_room`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRef {
    pub room: String,
}

/// Room list pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomList {
    #[serde(default)]
    pub rooms: Vec<String>,
}

/// Members of one room pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserList {
    pub room: String,
    #[serde(default)]
    pub users: Vec<String>,
}

// ---------------------------------------------------------------------------
// Chat payloads
// ---------------------------------------------------------------------------

/// A text or sticker message in a room.
///
/// `from` is empty when the client sends; the server fills it in before
/// broadcasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatText {
    pub room: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    pub content: String,
}

/// A message addressed to one member of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateText {
    pub room: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    pub content: String,
}

/// A whole audio payload in one frame.
///
/// Clients that cannot chunk send this and let the server split it into
/// an `audio_start` / `audio_chunk` / `audio_complete` sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioUpload {
    pub room: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    pub audio_name: String,
    pub audio_type: String,
    /// Base64 of the complete payload.
    pub audio_data: String,
}

/// Server-generated notice (join/leave announcements and similar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemNotice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub content: String,
}

/// Error reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub content: String,
}

// ---------------------------------------------------------------------------
// Chunked transfer payloads
// ---------------------------------------------------------------------------

/// Announces a chunked transfer to every member of `room`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStart {
    pub transfer_id: String,
    pub room: String,
    pub from: String,
    pub audio_name: String,
    pub audio_type: String,
    pub total_chunks: u32,
    /// Hex SHA-256 of the full payload. Older peers omit it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

/// One base64-encoded slice of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioChunk {
    pub transfer_id: String,
    pub seq: u32,
    pub total: u32,
    pub data: String,
    pub is_last: bool,
}

/// Sent after the last chunk of a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioComplete {
    pub transfer_id: String,
    pub room: String,
}

/// Receiver-to-sender acknowledgment of one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAck {
    pub transfer_id: String,
    pub seq: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_chunk_uses_camel_case() {
        let chunk = AudioChunk {
            transfer_id: "t1".into(),
            seq: 3,
            total: 4,
            data: "QQ==".into(),
            is_last: false,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains("\"transferId\":\"t1\""));
        assert!(json.contains("\"isLast\":false"));
        assert!(!json.contains("transfer_id"));
    }

    #[test]
    fn audio_start_omits_empty_checksum() {
        let start = AudioStart {
            transfer_id: "t1".into(),
            room: "lobby".into(),
            from: "ana".into(),
            audio_name: "memo.webm".into(),
            audio_type: "audio/webm".into(),
            total_chunks: 2,
            checksum: String::new(),
        };
        let json = serde_json::to_string(&start).unwrap();
        assert!(!json.contains("checksum"));
        assert!(json.contains("\"totalChunks\":2"));
    }

    #[test]
    fn audio_start_without_checksum_defaults_to_empty() {
        let json = r#"{
            "transferId":"t1","room":"lobby","from":"ana",
            "audioName":"memo.webm","audioType":"audio/webm","totalChunks":2
        }"#;
        let start: AudioStart = serde_json::from_str(json).unwrap();
        assert!(start.checksum.is_empty());
    }

    #[test]
    fn negative_seq_is_rejected() {
        let json = r#"{"transferId":"t1","seq":-1}"#;
        assert!(serde_json::from_str::<AudioAck>(json).is_err());
    }

    #[test]
    fn chat_text_from_is_optional() {
        let json = r#"{"room":"lobby","content":"hola"}"#;
        let text: ChatText = serde_json::from_str(json).unwrap();
        assert!(text.from.is_empty());
        let back = serde_json::to_string(&text).unwrap();
        assert!(!back.contains("from"));
    }

    #[test]
    fn system_notice_without_room() {
        let json = r#"{"content":"ana se ha conectado"}"#;
        let notice: SystemNotice = serde_json::from_str(json).unwrap();
        assert_eq!(notice.room, None);
    }
}
