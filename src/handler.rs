use crate::command::{Dispatched, Dispatcher, InteractionResponder, Invocation};
use poise::serenity_prelude as serenity;

pub struct Data {
    pub dispatcher: Dispatcher,
}

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, anyhow::Error>,
    data: &Data,
) -> Result<(), anyhow::Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Ready: {}", data_about_bot.user.name);
        }

        serenity::FullEvent::InteractionCreate { interaction } => {
            let serenity::Interaction::Command(command) = interaction else {
                return Ok(());
            };

            // radio holds its invocation for the whole broadcast
            tokio::spawn(handle_command(data.dispatcher.clone(), InteractionResponder {
                http: ctx.http.clone(),
                command: command.clone(),
            }));
        }
        _ => {}
    }
    Ok(())
}

async fn handle_command(dispatcher: Dispatcher, responder: InteractionResponder) {
    let invocation = Invocation::from_interaction(&responder.command);

    match dispatcher.dispatch(&invocation, &responder).await {
        Ok(Dispatched::Handled) => tracing::debug!("Handled /{}", invocation.name),
        Ok(Dispatched::Ignored) => {}
        Err(err) => tracing::error!("Error handling /{}: {:?}", invocation.name, err),
    }
}
