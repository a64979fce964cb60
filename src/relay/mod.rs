pub mod driver;
pub mod ffmpeg;
pub mod manager;
mod source;

use std::pin::Pin;
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;

pub const DISCORD_SAMPLE_RATE: u32 = 48_000;
pub const DISCORD_CHANNELS: u32 = 2;

/// 960 samples of 16-bit PCM.
pub const FRAME_SAMPLES: usize = 960;
pub const FRAME_BYTES: usize = FRAME_SAMPLES * 2;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to join voice channel: {0}")]
    Join(anyhow::Error),
    #[error("failed to start transcoder: {0}")]
    Transcoder(anyhow::Error),
    #[error("failed to update speaking state: {0}")]
    Speaking(anyhow::Error),
}

/// # VoiceSession: outbound half of a voice connection
///
/// Frames are raw s16le stereo PCM at 48 kHz. A session only accepts frames
/// while speaking.
#[async_trait]
pub trait VoiceSession: Send {
    async fn set_speaking(&mut self, speaking: bool) -> anyhow::Result<()>;

    async fn send(&mut self, frame: Vec<u8>) -> anyhow::Result<()>;

    async fn leave(&mut self) -> anyhow::Result<()>;
}

/// A failed `join` leaves no connection behind.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> anyhow::Result<Box<dyn VoiceSession>>;
}

/// Output pipe of a running transcoder, plus the process behind it if any.
pub struct TranscodeStream {
    output: Pin<Box<dyn AsyncRead + Send>>,
    process: Option<Child>,
}

impl TranscodeStream {
    pub fn new(output: impl AsyncRead + Send + 'static, process: Option<Child>) -> Self {
        Self { output: Box::pin(output), process }
    }

    async fn terminate(self) {
        let Some(mut child) = self.process else { return };

        if let Err(e) = child.kill().await {
            tracing::warn!("Failed to terminate transcoder: {}", e);
        }
    }
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn spawn(&self, url: &str) -> anyhow::Result<TranscodeStream>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    ReadError,
    SinkClosed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub frames: usize,
    pub reason: StopReason,
}

pub struct RelayTarget<'a> {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub url: &'a str,
}

/// Joins the target voice channel and streams the transcoder's output into it
/// until the stream ends, fails, or `cancel` fires.
///
/// The transcoder is killed and the voice channel left on every path that got
/// past the join.
pub async fn relay(
    gateway: &dyn VoiceGateway,
    transcoder: &dyn Transcoder,
    target: RelayTarget<'_>,
    cancel: CancellationToken,
) -> Result<RelayReport, RelayError> {
    let mut session = gateway.join(target.guild_id, target.channel_id).await
        .map_err(RelayError::Join)?;

    let mut stream = match transcoder.spawn(target.url).await {
        Ok(stream) => stream,
        Err(e) => {
            leave(session.as_mut()).await;
            return Err(RelayError::Transcoder(e));
        }
    };

    if let Err(e) = session.set_speaking(true).await {
        stream.terminate().await;
        leave(session.as_mut()).await;
        return Err(RelayError::Speaking(e));
    }

    let report = pump(&mut stream.output, session.as_mut(), &cancel).await;

    if let Err(e) = session.set_speaking(false).await {
        tracing::warn!("Failed to clear speaking state: {}", e);
    }

    stream.terminate().await;
    leave(session.as_mut()).await;

    tracing::info!("Relay in guild {} stopped after {} frames: {:?}", target.guild_id, report.frames, report.reason);

    Ok(report)
}

async fn pump(
    output: &mut Pin<Box<dyn AsyncRead + Send>>,
    session: &mut dyn VoiceSession,
    cancel: &CancellationToken,
) -> RelayReport {
    let mut frames = 0;

    loop {
        let mut frame = vec![0u8; FRAME_BYTES];

        let read = tokio::select! {
            _ = cancel.cancelled() => return RelayReport { frames, reason: StopReason::Cancelled },
            read = output.read_exact(&mut frame) => read,
        };

        match read {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return RelayReport { frames, reason: StopReason::EndOfStream };
            }
            Err(e) => {
                tracing::warn!("Transcoder read failed: {}", e);
                return RelayReport { frames, reason: StopReason::ReadError };
            }
        }

        let sent = tokio::select! {
            _ = cancel.cancelled() => return RelayReport { frames, reason: StopReason::Cancelled },
            sent = session.send(frame) => sent,
        };

        if let Err(e) = sent {
            tracing::warn!("Voice sink rejected frame: {}", e);
            return RelayReport { frames, reason: StopReason::SinkClosed };
        }

        frames += 1;
    }
}

async fn leave(session: &mut dyn VoiceSession) {
    if let Err(e) = session.leave().await {
        tracing::warn!("Failed to leave voice channel: {}", e);
    }
}
