use crate::relay::source::live_input;
use crate::relay::{VoiceGateway, VoiceSession};
use anyhow::Context;
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId};
use songbird::tracks::TrackHandle;
use songbird::{Call, Songbird};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Frames buffered between the relay and songbird's mixer, 20ms each.
const FEED_CAPACITY: usize = 50;

pub struct SongbirdGateway {
    manager: Arc<Songbird>,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> anyhow::Result<Box<dyn VoiceSession>> {
        let call = self.manager.join(guild_id, channel_id).await
            .context("songbird join failed")?;

        let configured = async {
            let mut handler = call.lock().await;
            handler.mute(false).await.context("failed to unmute")?;
            handler.deafen(true).await.context("failed to deafen")?;
            Ok::<(), anyhow::Error>(())
        };

        leave_on_error(configured.await, async {
            self.manager.remove(guild_id).await.context("failed to leave")
        }).await?;

        tracing::info!("Joined voice channel {} in guild {}", channel_id, guild_id);

        Ok(Box::new(SongbirdSession {
            manager: self.manager.clone(),
            guild_id,
            call,
            feed: None,
        }))
    }
}

/// Runs `leave` when a post-join step failed, so the call never outlives the error.
async fn leave_on_error<T>(
    result: anyhow::Result<T>,
    leave: impl Future<Output = anyhow::Result<()>>,
) -> anyhow::Result<T> {
    if result.is_err() {
        if let Err(e) = leave.await {
            tracing::warn!("Failed to leave voice channel after setup error: {}", e);
        }
    }
    result
}

struct Feed {
    tx: mpsc::Sender<Vec<u8>>,
    track: TrackHandle,
}

pub struct SongbirdSession {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    feed: Option<Feed>,
}

#[async_trait]
impl VoiceSession for SongbirdSession {
    async fn set_speaking(&mut self, speaking: bool) -> anyhow::Result<()> {
        if speaking {
            if self.feed.is_some() {
                return Ok(());
            }

            let (tx, rx) = mpsc::channel(FEED_CAPACITY);
            let track = self.call.lock().await.play_only_input(live_input(rx));
            self.feed = Some(Feed { tx, track });
        } else if let Some(feed) = self.feed.take() {
            drop(feed.tx);
            if let Err(e) = feed.track.stop() {
                tracing::debug!("Track already finished: {}", e);
            }
        }

        Ok(())
    }

    async fn send(&mut self, frame: Vec<u8>) -> anyhow::Result<()> {
        let feed = self.feed.as_ref()
            .ok_or_else(|| anyhow::anyhow!("not speaking"))?;

        feed.tx.send(frame).await
            .map_err(|_| anyhow::anyhow!("voice track ended"))
    }

    async fn leave(&mut self) -> anyhow::Result<()> {
        self.set_speaking(false).await?;
        self.manager.remove(self.guild_id).await?;
        tracing::info!("Left voice channel in guild {}", self.guild_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use super::*;

    #[tokio::test]
    async fn setup_failure_leaves_the_call() {
        let leaves = AtomicUsize::new(0);

        let result: anyhow::Result<()> = leave_on_error(Err(anyhow::anyhow!("deafen rejected")), async {
            leaves.fetch_add(1, Ordering::SeqCst);
            Ok::<(), anyhow::Error>(())
        }).await;

        assert!(result.is_err());
        assert_eq!(leaves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_setup_stays_connected() {
        let leaves = AtomicUsize::new(0);

        let result = leave_on_error(Ok(5), async {
            leaves.fetch_add(1, Ordering::SeqCst);
            Ok::<(), anyhow::Error>(())
        }).await;

        assert_eq!(result.unwrap(), 5);
        assert_eq!(leaves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_leave_keeps_the_setup_error() {
        let result: anyhow::Result<()> = leave_on_error(Err(anyhow::anyhow!("unmute rejected")), async {
            Err::<(), _>(anyhow::anyhow!("gateway gone"))
        }).await;

        assert_eq!(result.unwrap_err().to_string(), "unmute rejected");
    }
}
