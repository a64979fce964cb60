use anyhow::anyhow;
use config::Config;
use poise::serenity_prelude::{ChannelId, GuildId};
use serde::Deserialize;

pub const TOKEN_VARIABLE: &str = "BOT_TOKEN";

pub fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    let config = Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix("RADIOBOT").separator("__"))
        .set_override_option("bot.token", std::env::var(TOKEN_VARIABLE).ok())?
        .build()?;

    config.try_deserialize()
        .map_err(|e| anyhow!(e))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bot: BotConfig,

    pub radio: Option<RadioConfig>,
}

impl AppConfig {
    pub fn verify(&self) -> anyhow::Result<()> {
        if self.bot.token.is_empty() {
            return Err(anyhow!("bot token not found, set it in the {} environment variable", TOKEN_VARIABLE))
        }

        if let Some(radio) = &self.radio {
            if radio.stream_url.is_empty() {
                return Err(anyhow!("radio.stream_url is empty"))
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub token: String,
    pub guild_id: GuildId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RadioConfig {
    pub voice_channel_id: ChannelId,

    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
}

fn default_stream_url() -> String { String::from("https://fallout.fm:8444/falloutfm3.ogg") }

fn default_ffmpeg() -> String { String::from("ffmpeg") }

#[cfg(test)]
mod tests {
    use config::FileFormat;
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn radio_section_is_optional() {
        let config = parse(r#"
            [bot]
            token = "abc"
            guild_id = 813458127310946364
        "#);

        assert_eq!(config.bot.guild_id, GuildId::new(813458127310946364));
        assert!(config.radio.is_none());
        assert!(config.verify().is_ok());
    }

    #[test]
    fn radio_defaults_are_filled() {
        let config = parse(r#"
            [bot]
            token = "abc"
            guild_id = 1

            [radio]
            voice_channel_id = 834079206186024981
        "#);

        let radio = config.radio.unwrap();
        assert_eq!(radio.voice_channel_id, ChannelId::new(834079206186024981));
        assert_eq!(radio.stream_url, "https://fallout.fm:8444/falloutfm3.ogg");
        assert_eq!(radio.ffmpeg, "ffmpeg");
    }

    #[test]
    fn missing_token_fails_verification() {
        let config = parse(r#"
            [bot]
            guild_id = 1
        "#);

        assert!(config.verify().is_err());
    }
}
