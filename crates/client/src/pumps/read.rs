//! WebSocket read pump: decodes incoming frames for the session.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use roomcast_protocol::Frame;
use roomcast_protocol::constants::{WS_MAX_MESSAGE_SIZE, WS_PONG_WAIT};

/// Reads messages from the WebSocket and forwards decoded frames, in
/// arrival order, to `inbound_tx`.
///
/// Uses a read deadline to detect dead connections: if nothing arrives
/// within [`WS_PONG_WAIT`] the connection is considered dead and the loop
/// exits. Exiting drops `inbound_tx`, which the session sees as the end
/// of the connection.
pub(crate) async fn read_pump<S>(
    mut read: S,
    inbound_tx: mpsc::Sender<Frame>,
    write_tx: mpsc::UnboundedSender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    // Any incoming message resets the deadline, not just Pong.
    let pong_deadline = tokio::time::sleep(WS_PONG_WAIT);
    tokio::pin!(pong_deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut pong_deadline => {
                warn!("read deadline passed, connection dead, closing");
                break;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        pong_deadline.as_mut().reset(tokio::time::Instant::now() + WS_PONG_WAIT);

                        match msg {
                            tungstenite::Message::Text(text) => {
                                let Some(frame) = decode_text(&text) else { continue };
                                if inbound_tx.send(frame).await.is_err() {
                                    debug!("session gone, stopping read pump");
                                    break;
                                }
                            }
                            tungstenite::Message::Ping(data) => {
                                trace!("received ping, sending pong");
                                let _ = write_tx.send(tungstenite::Message::Pong(data));
                            }
                            tungstenite::Message::Pong(_) => {
                                trace!("received pong");
                            }
                            tungstenite::Message::Close(frame) => {
                                debug!(?frame, "received close frame");
                                break;
                            }
                            _ => {} // Binary: not part of the protocol
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }
}

/// Parses one text message. Oversized or malformed text is logged and dropped.
fn decode_text(text: &str) -> Option<Frame> {
    if text.len() > WS_MAX_MESSAGE_SIZE {
        warn!("message too large ({} bytes), dropping", text.len());
        return None;
    }

    match Frame::decode(text) {
        Ok(frame) => {
            trace!(kind = frame.kind(), "received frame");
            Some(frame)
        }
        Err(e) => {
            warn!("failed to parse frame: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use roomcast_protocol::AudioAck;

    fn text(frame: &Frame) -> Result<tungstenite::Message, tungstenite::Error> {
        Ok(tungstenite::Message::Text(frame.encode().unwrap().into()))
    }

    fn ack(seq: u32) -> Frame {
        Frame::AudioAck(AudioAck {
            transfer_id: "t1".into(),
            seq,
        })
    }

    #[test]
    fn decode_text_parses_frame() {
        let frame = decode_text(r#"{"type":"audio_ack","transferId":"t1","seq":3}"#).unwrap();
        assert_eq!(frame, ack(3));
    }

    #[test]
    fn decode_text_ignores_malformed_json() {
        assert!(decode_text("not valid json {{{").is_none());
    }

    #[test]
    fn decode_text_rejects_oversized_message() {
        let huge = "x".repeat(WS_MAX_MESSAGE_SIZE + 1);
        assert!(decode_text(&huge).is_none());
    }

    #[test]
    fn decode_text_keeps_unknown_types() {
        assert_eq!(
            decode_text(r#"{"type":"typing","room":"lobby"}"#),
            Some(Frame::Unknown)
        );
    }

    #[tokio::test]
    async fn read_pump_forwards_frames_in_order() {
        let (inbound_tx, mut inbound_rx) = mpsc::channel(16);
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let messages = stream::iter(vec![
            text(&ack(0)),
            Ok(tungstenite::Message::Text(String::from("garbage").into())),
            text(&ack(1)),
        ]);

        read_pump(messages, inbound_tx, write_tx, CancellationToken::new()).await;

        assert_eq!(inbound_rx.recv().await, Some(ack(0)));
        assert_eq!(inbound_rx.recv().await, Some(ack(1)));
        // Stream end drops the sender.
        assert_eq!(inbound_rx.recv().await, None);
    }

    #[tokio::test]
    async fn read_pump_answers_ping_with_pong() {
        let (inbound_tx, _inbound_rx) = mpsc::channel(16);
        let (write_tx, mut write_rx) = mpsc::unbounded_channel();
        let messages = stream::iter(vec![Ok(tungstenite::Message::Ping(vec![7u8].into()))]);

        read_pump(messages, inbound_tx, write_tx, CancellationToken::new()).await;

        match write_rx.recv().await {
            Some(tungstenite::Message::Pong(data)) => assert_eq!(&data[..], &[7u8]),
            other => panic!("expected pong, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_pump_stops_on_close_frame() {
        let (inbound_tx, mut inbound_rx) = mpsc::channel(16);
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let messages = stream::iter(vec![
            Ok(tungstenite::Message::Close(None)),
            text(&ack(0)),
        ]);

        read_pump(messages, inbound_tx, write_tx, CancellationToken::new()).await;
        assert_eq!(inbound_rx.recv().await, None);
    }

    #[tokio::test]
    async fn read_pump_timeout_on_silence() {
        // With no messages arriving, the deadline fires within WS_PONG_WAIT.
        tokio::time::pause();

        let (inbound_tx, mut inbound_rx) = mpsc::channel(16);
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let silent = stream::pending::<Result<tungstenite::Message, tungstenite::Error>>();

        read_pump(silent, inbound_tx, write_tx, CancellationToken::new()).await;
        assert_eq!(inbound_rx.recv().await, None);
    }

    #[tokio::test]
    async fn read_pump_resets_deadline_on_any_message() {
        tokio::time::pause();

        let (inbound_tx, mut inbound_rx) = mpsc::channel(16);
        let (write_tx, _write_rx) = mpsc::unbounded_channel();

        // One message just before the deadline, then silence.
        let wait_before_msg = WS_PONG_WAIT - std::time::Duration::from_secs(1);
        let delayed = stream::once(async move {
            tokio::time::sleep(wait_before_msg).await;
            text(&ack(0))
        });
        let combined = Box::pin(delayed.chain(stream::pending()));

        let handle = tokio::spawn(read_pump(
            combined,
            inbound_tx,
            write_tx,
            CancellationToken::new(),
        ));

        // Let the pump arm its deadline at t=0.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        tokio::time::advance(wait_before_msg + std::time::Duration::from_millis(100)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(inbound_rx.try_recv().ok(), Some(ack(0)));

        // Past the first deadline.
        tokio::time::advance(std::time::Duration::from_secs(2)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!handle.is_finished(), "deadline should have been reset");

        tokio::time::advance(WS_PONG_WAIT).await;
        handle.await.unwrap();
        assert_eq!(inbound_rx.recv().await, None);
    }

    #[tokio::test]
    async fn read_pump_stops_on_cancel() {
        let (inbound_tx, _inbound_rx) = mpsc::channel(16);
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let silent = stream::pending::<Result<tungstenite::Message, tungstenite::Error>>();

        let c = cancel.clone();
        let handle = tokio::spawn(read_pump(silent, inbound_tx, write_tx, c));
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("should stop")
            .expect("no panic");
    }
}
