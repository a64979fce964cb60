use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "radio-bot-rs")]
pub struct Cli {
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Connect to Discord and serve commands until interrupted
    Run,
    /// Remove every command this bot registered in the configured guild
    Purge,
}
