use std::process::Stdio;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::process::Command;
use crate::relay::{TranscodeStream, Transcoder, DISCORD_CHANNELS, DISCORD_SAMPLE_RATE};

/// Decodes a network stream to raw s16le PCM with an external ffmpeg.
pub struct FfmpegTranscoder {
    program: String,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    fn args(url: &str) -> Vec<String> {
        vec![
            "-hide_banner".to_owned(),
            "-loglevel".to_owned(), "error".to_owned(),
            "-i".to_owned(), url.to_owned(),
            "-f".to_owned(), "s16le".to_owned(),
            "-ar".to_owned(), DISCORD_SAMPLE_RATE.to_string(),
            "-ac".to_owned(), DISCORD_CHANNELS.to_string(),
            "pipe:1".to_owned(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn spawn(&self, url: &str) -> anyhow::Result<TranscodeStream> {
        let mut child = Command::new(&self.program)
            .args(Self::args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("error starting {}", self.program))?;

        let stdout = child.stdout.take()
            .ok_or_else(|| anyhow!("error retrieving audio stream"))?;

        tracing::debug!("Spawned {} (pid {:?}) for {}", self.program, child.id(), url);

        Ok(TranscodeStream::new(stdout, Some(child)))
    }
}
