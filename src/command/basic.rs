use anyhow::anyhow;
use async_trait::async_trait;
use crate::command::{CommandDefinition, CommandHandler, Invocation, Responder, Result};

pub struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition::new("ping", "Replies with Pong!")
    }

    async fn handle(&self, _: &Invocation, responder: &dyn Responder) -> Result<()> {
        responder.reply("Pong!".to_owned()).await
    }
}

pub struct Echo;

#[async_trait]
impl CommandHandler for Echo {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition::new("echo", "Repeats your input")
            .string_option("text", "Text to repeat", true)
    }

    async fn handle(&self, invocation: &Invocation, responder: &dyn Responder) -> Result<()> {
        let text = invocation.argument("text")
            .ok_or_else(|| anyhow!("echo invoked without text"))?;

        responder.reply(text.to_owned()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_utils::{invocation, MockResponder};

    #[tokio::test]
    async fn echo_keeps_whitespace_and_markup() {
        let responder = MockResponder::new();

        Echo.handle(&invocation("echo", &[("text", "  **bold** \n")]), &responder).await.unwrap();

        assert_eq!(responder.replies(), vec!["  **bold** \n"]);
    }

    #[tokio::test]
    async fn echo_reads_text_by_name() {
        let responder = MockResponder::new();

        Echo.handle(&invocation("echo", &[("other", "nope"), ("text", "hello")]), &responder).await.unwrap();

        assert_eq!(responder.replies(), vec!["hello"]);
    }

    #[tokio::test]
    async fn echo_without_argument_fails_without_reply() {
        let responder = MockResponder::new();

        let result = Echo.handle(&invocation("echo", &[]), &responder).await;

        assert!(result.is_err());
        assert!(responder.replies().is_empty());
    }
}
