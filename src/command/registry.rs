use std::sync::Arc;
use anyhow::Context;
use async_trait::async_trait;
use poise::serenity_prelude::{CommandId, GuildId, Http};
use crate::command::{CommandDefinition, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCommand {
    pub name: String,
    pub id: CommandId,
}

#[async_trait]
pub trait CommandRegistrar: Send + Sync {
    async fn create(&self, definition: &CommandDefinition) -> Result<RegisteredCommand>;

    async fn delete(&self, command: &RegisteredCommand) -> Result<()>;
}

/// Registers commands on a single guild through the HTTP API.
pub struct GuildRegistrar {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl GuildRegistrar {
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }

    /// Drops every command of this application in the guild, including ones
    /// left behind by an unclean exit.
    pub async fn purge(&self) -> Result<()> {
        self.guild_id.set_commands(&self.http, Vec::new()).await
            .with_context(|| format!("failed to clear commands in guild {}", self.guild_id))?;
        Ok(())
    }
}

#[async_trait]
impl CommandRegistrar for GuildRegistrar {
    async fn create(&self, definition: &CommandDefinition) -> Result<RegisteredCommand> {
        let command = self.guild_id.create_command(&self.http, definition.to_builder()).await?;
        Ok(RegisteredCommand { name: command.name, id: command.id })
    }

    async fn delete(&self, command: &RegisteredCommand) -> Result<()> {
        self.guild_id.delete_command(&self.http, command.id).await?;
        Ok(())
    }
}

/// Registers each definition in turn. Failures are logged and skipped.
pub async fn register_all(registrar: &dyn CommandRegistrar, definitions: &[CommandDefinition]) -> Vec<RegisteredCommand> {
    let mut registered = Vec::with_capacity(definitions.len());

    for definition in definitions {
        match registrar.create(definition).await {
            Ok(command) => {
                tracing::info!("Registered command: {} ({})", command.name, command.id);
                registered.push(command);
            }
            Err(e) => tracing::error!("Failed to register command {}: {:?}", definition.name, e),
        }
    }

    registered
}

/// Deletes every handle, carrying on past failures. Returns how many failed.
pub async fn deregister_all(registrar: &dyn CommandRegistrar, registered: &[RegisteredCommand]) -> usize {
    let mut failures = 0;

    for command in registered {
        match registrar.delete(command).await {
            Ok(()) => tracing::info!("Deleted command: {}", command.name),
            Err(e) => {
                failures += 1;
                tracing::error!("Failed to delete command {}: {:?}", command.name, e);
            }
        }
    }

    failures
}
