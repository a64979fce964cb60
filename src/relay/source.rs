use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use async_trait::async_trait;
use songbird::input::{AsyncAdapterStream, AsyncMediaSource, Input, RawAdapter};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use tokio::sync::mpsc;
use crate::relay::{DISCORD_CHANNELS, DISCORD_SAMPLE_RATE};

/// Bytes songbird's adapter buffers ahead of the mixer.
const ADAPTER_BUFFER: usize = 64 * 1024;

/// Builds a live songbird input that plays whatever frames arrive on `rx`.
pub fn live_input(rx: mpsc::Receiver<Vec<u8>>) -> Input {
    let stream = AsyncAdapterStream::new(Box::new(PcmFeed::new(rx)), ADAPTER_BUFFER);
    RawAdapter::new(stream, DISCORD_SAMPLE_RATE, DISCORD_CHANNELS).into()
}

/// Live PCM feed handed to songbird.
///
/// Frames arrive as s16le and are served as f32le, which is what songbird's
/// raw adapter expects. The feed ends once every sender is dropped.
pub struct PcmFeed {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
}

impl PcmFeed {
    pub fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            offset: 0,
        }
    }
}

pub fn to_f32le(pcm: &[u8]) -> Vec<u8> {
    pcm.chunks_exact(2)
        .map(|s| i16::from_le_bytes([s[0], s[1]]) as f32 / 32768.0)
        .flat_map(f32::to_le_bytes)
        .collect()
}

impl AsyncRead for PcmFeed {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;

        while this.offset >= this.pending.len() {
            match ready!(this.rx.poll_recv(cx)) {
                Some(frame) => {
                    this.pending = to_f32le(&frame);
                    this.offset = 0;
                }
                None => return Poll::Ready(Ok(())),
            }
        }

        let available = &this.pending[this.offset..];
        let n = available.len().min(buf.remaining());
        buf.put_slice(&available[..n]);
        this.offset += n;

        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for PcmFeed {
    fn start_seek(self: Pin<&mut Self>, _: SeekFrom) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "live feed is not seekable"))
    }

    fn poll_complete(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::Unsupported, "live feed is not seekable")))
    }
}

#[async_trait]
impl AsyncMediaSource for PcmFeed {
    fn is_seekable(&self) -> bool {
        false
    }

    async fn byte_len(&self) -> Option<u64> {
        None
    }
}
