mod actor_framework;
mod app_system;
mod clock;
mod commands;
mod domain;
mod error;
mod notify;
mod order_service;
mod scheduler;
mod store;

#[cfg(test)]
mod mock_framework;

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tracing::{info, Instrument};

use crate::app_system::{setup_tracing, AppConfig, OrderBotSystem};
use crate::clock::{Clock, SystemClock};
use crate::commands::ChatUser;

const DEMO_CHAT: i64 = -1001;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = AppConfig::from_env()?;
    info!("Starting group order bot");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (system, mut outbox) = OrderBotSystem::new(&config, clock.clone());

    // Stand-in for the chat transport: print whatever the bot says.
    let transport = tokio::spawn(async move {
        while let Some(message) = outbox.recv().await {
            info!(chat_id = message.chat_id, options = ?message.options, "Outbound:\n{}", message.text);
        }
    });

    let alice = ChatUser::new(1, "Alice");
    let bob = ChatUser::new(2, "Bob");
    let deadline = (clock.now() + ChronoDuration::minutes(30))
        .with_timezone(&config.timezone)
        .format("%H:%M")
        .to_string();

    let span = tracing::info_span!("demo_chat", chat_id = DEMO_CHAT);
    async {
        let dispatcher = &system.dispatcher;
        dispatcher.handle_message(DEMO_CHAT, &alice, "/help").await;
        dispatcher.handle_message(DEMO_CHAT, &alice, &format!("/neworder {} Chicken rice lunch", deadline)).await;
        dispatcher.handle_message(DEMO_CHAT, &alice, "/order 2 Chicken rice").await;
        dispatcher.handle_message(DEMO_CHAT, &bob, "/order 1 chicken rice").await;
        dispatcher.handle_message(DEMO_CHAT, &bob, "/order 1 Iced lemon tea").await;

        // Bob changes his mind about the drink.
        dispatcher.handle_message(DEMO_CHAT, &bob, "/cancelorder").await;
        if let Ok(items) = system.orders.list_user_items(DEMO_CHAT, bob.id).await {
            if let Some(drink) = items.iter().find(|item| item.name.contains("tea")) {
                dispatcher.handle_callback(DEMO_CHAT, &bob, &format!("/delete {}", drink.id)).await;
            }
        }

        dispatcher.handle_message(DEMO_CHAT, &alice, "/endorders").await;
    }
    .instrument(span)
    .await;

    // Shutdown system gracefully
    system.shutdown().await?;
    transport.await?;

    info!("Application completed successfully");
    Ok(())
}
