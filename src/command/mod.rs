mod basic;
pub mod radio;
pub mod registry;

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use poise::serenity_prelude::{
    ChannelId, CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption,
    CreateInteractionResponse, CreateInteractionResponseMessage, GuildId, Http,
};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub options: Vec<OptionDefinition>,
}

impl CommandDefinition {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description, options: Vec::new() }
    }

    pub fn string_option(mut self, name: &'static str, description: &'static str, required: bool) -> Self {
        self.options.push(OptionDefinition { name, description, required });
        self
    }

    pub fn to_builder(&self) -> CreateCommand {
        self.options.iter().fold(
            CreateCommand::new(self.name).description(self.description),
            |command, option| command.add_option(
                CreateCommandOption::new(CommandOptionType::String, option.name, option.description)
                    .required(option.required)
            ),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub value: Option<String>,
}

/// One application-command interaction, detached from the gateway types.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub name: String,
    pub arguments: Vec<Argument>,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
}

impl Invocation {
    pub fn from_interaction(command: &CommandInteraction) -> Self {
        Self {
            name: command.data.name.clone(),
            arguments: command.data.options.iter()
                .map(|option| Argument {
                    name: option.name.clone(),
                    value: option.value.as_str().map(str::to_owned),
                })
                .collect(),
            guild_id: command.guild_id,
            channel_id: command.channel_id,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, content: String) -> Result<()>;
}

pub struct InteractionResponder {
    pub http: Arc<Http>,
    pub command: CommandInteraction,
}

#[async_trait]
impl Responder for InteractionResponder {
    async fn reply(&self, content: String) -> Result<()> {
        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new().content(content)
        );
        self.command.create_response(&self.http, response).await?;
        Ok(())
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn definition(&self) -> CommandDefinition;

    async fn handle(&self, invocation: &Invocation, responder: &dyn Responder) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Handled,
    Ignored,
}

/// Name-keyed table of command handlers, fixed once built.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: Arc<HashMap<&'static str, Arc<dyn CommandHandler>>>,
    order: Arc<Vec<&'static str>>,
}

impl Dispatcher {
    pub fn new(handlers: Vec<Arc<dyn CommandHandler>>) -> Self {
        let order = handlers.iter().map(|h| h.definition().name).collect();
        let handlers = handlers.into_iter()
            .map(|h| (h.definition().name, h))
            .collect();

        Self {
            handlers: Arc::new(handlers),
            order: Arc::new(order),
        }
    }

    pub fn definitions(&self) -> Vec<CommandDefinition> {
        self.order.iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|h| h.definition())
            .collect()
    }

    pub async fn dispatch(&self, invocation: &Invocation, responder: &dyn Responder) -> Result<Dispatched> {
        let Some(handler) = self.handlers.get(invocation.name.as_str()) else {
            tracing::debug!("Ignoring unknown command: {}", invocation.name);
            return Ok(Dispatched::Ignored);
        };

        handler.handle(invocation, responder).await?;

        Ok(Dispatched::Handled)
    }
}

/// Builds the command table. `radio` is only present when configured.
pub fn commands(radio: Option<radio::Radio>) -> Dispatcher {
    let mut handlers: Vec<Arc<dyn CommandHandler>> = vec![
        Arc::new(basic::Ping),
        Arc::new(basic::Echo),
    ];

    if let Some(radio) = radio {
        handlers.push(Arc::new(radio));
    }

    Dispatcher::new(handlers)
}

#[cfg(test)]
pub mod test_utils {
    use std::sync::Mutex;
    use async_trait::async_trait;
    use poise::serenity_prelude::{ChannelId, GuildId};
    use crate::command::{Argument, Invocation, Responder, Result};

    #[derive(Default)]
    pub struct MockResponder {
        replies: Mutex<Vec<String>>,
    }

    impl MockResponder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn replies(&self) -> Vec<String> {
            self.replies.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Responder for MockResponder {
        async fn reply(&self, content: String) -> Result<()> {
            self.replies.lock().unwrap().push(content);
            Ok(())
        }
    }

    pub fn invocation(name: &str, arguments: &[(&str, &str)]) -> Invocation {
        Invocation {
            name: name.to_owned(),
            arguments: arguments.iter()
                .map(|(name, value)| Argument { name: name.to_string(), value: Some(value.to_string()) })
                .collect(),
            guild_id: Some(GuildId::new(1)),
            channel_id: ChannelId::new(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_utils::{invocation, MockResponder};

    #[tokio::test]
    async fn ping_replies_pong_once() {
        let responder = MockResponder::new();

        let result = commands(None).dispatch(&invocation("ping", &[]), &responder).await.unwrap();

        assert_eq!(result, Dispatched::Handled);
        assert_eq!(responder.replies(), vec!["Pong!"]);
    }

    #[tokio::test]
    async fn echo_repeats_argument_verbatim() {
        let responder = MockResponder::new();

        commands(None).dispatch(&invocation("echo", &[("text", "hello")]), &responder).await.unwrap();

        assert_eq!(responder.replies(), vec!["hello"]);
    }

    #[tokio::test]
    async fn unknown_command_is_ignored_silently() {
        let responder = MockResponder::new();
        let dispatcher = commands(None);

        for name in ["radio", "pong", "", "PING"] {
            let result = dispatcher.dispatch(&invocation(name, &[]), &responder).await.unwrap();
            assert_eq!(result, Dispatched::Ignored, "{name:?} should be ignored");
        }

        assert!(responder.replies().is_empty());
    }

    #[test]
    fn definitions_keep_registration_order() {
        let names: Vec<_> = commands(None).definitions().into_iter().map(|d| d.name).collect();

        assert_eq!(names, vec!["ping", "echo"]);
    }

    #[test]
    fn echo_declares_required_text_option() {
        let echo = commands(None).definitions().into_iter().find(|d| d.name == "echo").unwrap();

        assert_eq!(echo.options, vec![OptionDefinition { name: "text", description: "Text to repeat", required: true }]);
    }
}
