use std::sync::Arc;
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId};
use crate::command::{CommandDefinition, CommandHandler, Invocation, Responder, Result};
use crate::relay::manager::RelayManager;
use crate::relay::{relay, RelayTarget, Transcoder, VoiceGateway};

/// Streams the configured station into a fixed voice channel.
///
/// The interaction gets no response; failures only reach the log.
pub struct Radio {
    gateway: Arc<dyn VoiceGateway>,
    transcoder: Arc<dyn Transcoder>,
    relays: Arc<RelayManager>,
    guild_id: GuildId,
    voice_channel_id: ChannelId,
    stream_url: String,
}

impl Radio {
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        transcoder: Arc<dyn Transcoder>,
        relays: Arc<RelayManager>,
        guild_id: GuildId,
        voice_channel_id: ChannelId,
        stream_url: String,
    ) -> Self {
        Self { gateway, transcoder, relays, guild_id, voice_channel_id, stream_url }
    }
}

#[async_trait]
impl CommandHandler for Radio {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition::new("radio", "Plays the radio station in the voice channel")
    }

    async fn handle(&self, _: &Invocation, _: &dyn Responder) -> Result<()> {
        let ticket = self.relays.acquire(self.guild_id).await;

        let target = RelayTarget {
            guild_id: self.guild_id,
            channel_id: self.voice_channel_id,
            url: &self.stream_url,
        };

        if let Err(err) = relay(self.gateway.as_ref(), self.transcoder.as_ref(), target, ticket.cancel.clone()).await {
            tracing::error!("Error playing radio: {}", err);
        }

        Ok(())
    }
}
