fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use roomcast_protocol::Frame;
    use roomcast_transfer::{TransferEvent, TransferReceiver};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (key order independent).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  Rust: {reserialized}"
        );
        parsed
    }

    // --- Session and chat frames ---

    #[test]
    fn fixture_login() {
        let frame = roundtrip_test::<Frame>("login.json");
        assert_eq!(frame.kind(), "login");
    }

    #[test]
    fn fixture_join_room() {
        let frame = roundtrip_test::<Frame>("join_room.json");
        assert_eq!(frame.room(), Some("lobby"));
    }

    #[test]
    fn fixture_message() {
        roundtrip_test::<Frame>("message.json");
    }

    #[test]
    fn fixture_private_message() {
        roundtrip_test::<Frame>("private_message.json");
    }

    #[test]
    fn fixture_system() {
        roundtrip_test::<Frame>("system.json");
    }

    #[test]
    fn fixture_rooms() {
        roundtrip_test::<Frame>("rooms.json");
    }

    #[test]
    fn fixture_users() {
        roundtrip_test::<Frame>("users.json");
    }

    #[test]
    fn fixture_error() {
        roundtrip_test::<Frame>("error.json");
    }

    #[test]
    fn fixture_audio_upload() {
        let frame = roundtrip_test::<Frame>("audio.json");
        assert!(!frame.is_transfer());
    }

    // --- Chunked transfer frames ---

    #[test]
    fn fixture_audio_start() {
        match roundtrip_test::<Frame>("audio_start.json") {
            Frame::AudioStart(start) => {
                assert_eq!(start.total_chunks, 3);
                assert_eq!(start.checksum.len(), 64);
            }
            other => panic!("expected audio_start, got {other:?}"),
        }
    }

    #[test]
    fn fixture_audio_start_without_checksum() {
        match roundtrip_test::<Frame>("audio_start_no_checksum.json") {
            Frame::AudioStart(start) => assert!(start.checksum.is_empty()),
            other => panic!("expected audio_start, got {other:?}"),
        }
    }

    #[test]
    fn fixture_audio_chunk() {
        match roundtrip_test::<Frame>("audio_chunk.json") {
            Frame::AudioChunk(chunk) => {
                assert_eq!(chunk.seq, 2);
                assert!(chunk.is_last);
            }
            other => panic!("expected audio_chunk, got {other:?}"),
        }
    }

    #[test]
    fn fixture_audio_complete() {
        roundtrip_test::<Frame>("audio_complete.json");
    }

    #[test]
    fn fixture_audio_ack() {
        let frame = roundtrip_test::<Frame>("audio_ack.json");
        assert!(frame.is_transfer());
    }

    #[test]
    fn unknown_frame_type_is_tolerated() {
        let frame = Frame::decode(r#"{"type":"typing","room":"lobby","from":"ana"}"#).unwrap();
        assert_eq!(frame, Frame::Unknown);
    }

    #[test]
    fn fixture_transfer_sequence_reconstructs() {
        let frames: Vec<Frame> = serde_json::from_value(load_fixture("transfer_sequence.json"))
            .expect("sequence should decode");

        let mut receiver = TransferReceiver::new("bo");
        let mut acks = Vec::new();
        let events: Vec<TransferEvent> = frames
            .iter()
            .filter_map(|frame| receiver.handle(frame, &mut acks))
            .collect();

        assert_eq!(events.len(), 2);
        match &events[1] {
            TransferEvent::Received(payload) => {
                assert_eq!(payload.data, b"Hello");
                assert_eq!(payload.payload_name, "hello.txt");
            }
            other => panic!("expected Received, got {other:?}"),
        }

        let acks: Vec<serde_json::Value> = acks
            .iter()
            .map(|f| serde_json::to_value(f).unwrap())
            .collect();
        assert_eq!(
            acks,
            vec![
                serde_json::json!({"type": "audio_ack", "transferId": "seq-1", "seq": 1}),
                serde_json::json!({"type": "audio_ack", "transferId": "seq-1", "seq": 0}),
            ]
        );
    }
}
