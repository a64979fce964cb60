use anyhow::Context;
use clap::Parser;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::{GatewayIntents, GuildId, Http};
use radio_bot_rs::cli::{Cli, Commands};
use radio_bot_rs::command;
use radio_bot_rs::command::radio::Radio;
use radio_bot_rs::command::registry::{deregister_all, register_all, GuildRegistrar, RegisteredCommand};
use radio_bot_rs::config::{load_config, AppConfig};
use radio_bot_rs::handler::{event_handler, Data};
use radio_bot_rs::relay::driver::SongbirdGateway;
use radio_bot_rs::relay::ffmpeg::FfmpegTranscoder;
use radio_bot_rs::relay::manager::RelayManager;
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

const RELAY_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config))?;

    config.verify()?;

    info!("Loaded config");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Purge => purge(config).await,
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let guild_id = config.bot.guild_id;
    let voice = Songbird::serenity();
    let relays = Arc::new(RelayManager::new());

    let radio = config.radio.as_ref().map(|radio| {
        info!("Radio enabled for voice channel {}", radio.voice_channel_id);
        Radio::new(
            Arc::new(SongbirdGateway::new(voice.clone())),
            Arc::new(FfmpegTranscoder::new(radio.ffmpeg.clone())),
            relays.clone(),
            guild_id,
            radio.voice_channel_id,
            radio.stream_url.clone(),
        )
    });

    let dispatcher = command::commands(radio);
    let registered: Arc<Mutex<Vec<RegisteredCommand>>> = Arc::default();
    let setup_registered = registered.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, _framework| {
            Box::pin(async move {
                let registrar = GuildRegistrar::new(ctx.http.clone(), guild_id);
                let handles = register_all(&registrar, &dispatcher.definitions()).await;
                setup_registered.lock().await.extend(handles);

                info!("Bot started. Press CTRL+C to exit.");

                Ok(Data { dispatcher })
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged();
    let mut client = serenity::ClientBuilder::new(&config.bot.token, intents)
        .register_songbird_with(voice)
        .framework(framework).await
        .context("Failed to create client")?;

    let shard_manager = client.shard_manager.clone();
    let http = client.http.clone();

    tokio::spawn(async move {
        shutdown_signal().await;

        if tokio::time::timeout(RELAY_DRAIN_TIMEOUT, relays.shutdown()).await.is_err() {
            tracing::warn!("Relays did not stop within {:?}", RELAY_DRAIN_TIMEOUT);
        }

        let handles = std::mem::take(&mut *registered.lock().await);
        let failures = deregister_all(&GuildRegistrar::new(http, guild_id), &handles).await;
        if failures > 0 {
            tracing::warn!("{} command(s) could not be deleted, run `purge` to clean up", failures);
        }

        shard_manager.shutdown_all().await;
    });

    client.start().await.context("Failed to open connection")?;

    info!("Bot stopped");

    Ok(())
}

async fn purge(config: AppConfig) -> anyhow::Result<()> {
    let guild_id: GuildId = config.bot.guild_id;
    let http = Arc::new(Http::new(&config.bot.token));

    let application = http.get_current_application_info().await
        .context("Failed to fetch application info")?;
    http.set_application_id(application.id);

    GuildRegistrar::new(http, guild_id).purge().await?;

    info!("Purged commands in guild {}", guild_id);

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => { sigterm.recv().await; }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
