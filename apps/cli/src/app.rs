//! Application orchestrator: connects, sends files, prints room events.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use roomcast_client::{ClientEvent, RoomClient};
use roomcast_protocol::Frame;
use roomcast_transfer::{TransferEvent, decode_chunk, sanitize_payload_name};

use crate::config::Config;

const USAGE: &str = "usage: roomcast <room> [file ...]";

/// Command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub room: String,
    pub files: Vec<PathBuf>,
}

impl Args {
    pub fn parse<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let Some(room) = args
            .next()
            .filter(|r| !r.is_empty() && !r.starts_with('-'))
        else {
            bail!(USAGE);
        };
        Ok(Self {
            room,
            files: args.map(PathBuf::from).collect(),
        })
    }
}

/// Runs the client until the connection drops or Ctrl-C.
pub async fn run(config: Config, args: Args) -> anyhow::Result<()> {
    let (client, mut events) = RoomClient::connect_with(
        &config.server_url,
        &config.username,
        config.session_options(),
    )
    .await
    .with_context(|| format!("connecting to {}", config.server_url))?;

    client.join_room(&args.room)?;
    tracing::info!(room = %args.room, "joined room");

    // Events are drained while files go out so acks never back up.
    let sends = send_files(&client, &args.room, &args.files);
    tokio::pin!(sends);
    let mut sending = !args.files.is_empty();

    loop {
        tokio::select! {
            () = &mut sends, if sending => sending = false,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received, shutting down");
                client.close();
            }
            event = events.recv() => match event {
                Some(ClientEvent::Disconnected) | None => break,
                Some(event) => handle_event(&config.download_dir, event),
            },
        }
    }

    Ok(())
}

async fn send_files(client: &RoomClient, room: &str, files: &[PathBuf]) {
    for path in files {
        if let Err(e) = send_file(client, room, path).await {
            tracing::error!(path = %path.display(), "failed to send file: {e:#}");
        }
    }
}

async fn send_file(client: &RoomClient, room: &str, path: &Path) -> anyhow::Result<()> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("file has no usable name")?;

    let sent = client
        .send_payload(room, name, guess_kind(path), data)
        .await?;
    tracing::info!(
        transfer_id = %sent.transfer_id,
        chunks = sent.total_chunks,
        name,
        "file sent"
    );
    Ok(())
}

fn handle_event(download_dir: &Path, event: ClientEvent) {
    match event {
        ClientEvent::Chat(Frame::Audio(audio)) => {
            // Whole-payload upload relayed by the server.
            let saved = decode_chunk(&audio.audio_data)
                .map_err(anyhow::Error::from)
                .and_then(|data| save_payload(download_dir, &audio.audio_name, &data));
            match saved {
                Ok(path) => println!(
                    "[{}] {} sent {} -> {}",
                    audio.room,
                    audio.from,
                    audio.audio_name,
                    path.display()
                ),
                Err(e) => tracing::error!(name = %audio.audio_name, "dropping audio: {e:#}"),
            }
        }
        ClientEvent::Chat(frame) => {
            if let Some(line) = describe_frame(&frame) {
                println!("{line}");
            }
        }
        ClientEvent::Transfer(event) => handle_transfer(download_dir, event),
        ClientEvent::AckProgress {
            transfer_id,
            acked,
            total,
        } => {
            if acked == total {
                tracing::info!(%transfer_id, total, "delivery confirmed");
            } else {
                tracing::debug!(%transfer_id, acked, total, "ack progress");
            }
        }
        ClientEvent::Disconnected => {}
    }
}

fn handle_transfer(download_dir: &Path, event: TransferEvent) {
    match event {
        TransferEvent::Started {
            from,
            payload_name,
            total_chunks,
            ..
        } => println!("* {from} is sending {payload_name} ({total_chunks} chunks)"),
        TransferEvent::Received(payload) => {
            match save_payload(download_dir, &payload.payload_name, &payload.data) {
                Ok(path) => println!(
                    "[{}] {} sent {} -> {}",
                    payload.room,
                    payload.sender,
                    payload.payload_name,
                    path.display()
                ),
                Err(e) => tracing::error!(
                    name = %payload.payload_name,
                    "failed to save payload: {e:#}"
                ),
            }
        }
        TransferEvent::Failed {
            from,
            payload_name,
            reason,
            ..
        } => println!("* {payload_name} from {from} was lost: {reason}"),
        TransferEvent::Abandoned {
            payload_name,
            received,
            total,
            ..
        } => println!("* {payload_name} abandoned at {received}/{total} chunks"),
    }
}

/// Renders a chat frame as one terminal line.
fn describe_frame(frame: &Frame) -> Option<String> {
    let line = match frame {
        Frame::LoginOk(login) => format!("* logged in as {}", login.username),
        Frame::Message(m) => format!("[{}] {}: {}", m.room, m.from, m.content),
        Frame::Sticker(m) => format!("[{}] {} sent a sticker: {}", m.room, m.from, m.content),
        Frame::PrivateMessage(m) => format!("[{}] {} -> {}: {}", m.room, m.from, m.to, m.content),
        Frame::System(s) => match &s.room {
            Some(room) => format!("[{room}] * {}", s.content),
            None => format!("* {}", s.content),
        },
        Frame::Error(e) => format!("! {}", e.content),
        Frame::Rooms(r) => format!("rooms: {}", r.rooms.join(", ")),
        Frame::Users(u) => format!("[{}] users: {}", u.room, u.users.join(", ")),
        _ => return None,
    };
    Some(line)
}

/// Writes a received payload under `dir`, never overwriting an existing file.
fn save_payload(dir: &Path, payload_name: &str, data: &[u8]) -> anyhow::Result<PathBuf> {
    let name = sanitize_payload_name(payload_name)?;
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let path = unique_path(dir, &name);
    std::fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let ext = as_path.extension().and_then(|e| e.to_str());
    (1u32..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem}-{n}.{ext}")),
            None => dir.join(format!("{stem}-{n}")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Media type announced for a file, from its extension.
fn guess_kind(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("webm") => "audio/webm",
        Some("ogg" | "oga" | "opus") => "audio/ogg",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a" | "mp4") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}
