use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use order_intake_bot::bot;
use order_intake_bot::config::{is_hosted, BotConfig, Deployment};
use order_intake_bot::engine::{Command, ConversationEngine};
use order_intake_bot::localization::LocalizationManager;
use order_intake_bot::notification::{NotificationDispatcher, RetryPolicy, SmtpMailer};

#[tokio::main]
async fn main() -> Result<()> {
    // Hosted deployments get their environment from the platform, not from .env
    let production = is_hosted(std::env::var("RENDER").ok().as_deref());
    if !production {
        dotenv::dotenv().ok();
    }

    init_tracing(production);

    info!("Starting order intake bot");

    let config = match BotConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(config = ?config, "Configuration loaded");

    let mailer = SmtpMailer::new(&config.email)?;
    let notifier = NotificationDispatcher::new(mailer, config.email.address.clone(), RetryPolicy::default());
    let localization = Arc::new(LocalizationManager::new().context("Failed to load localization resources")?);
    let engine = Arc::new(ConversationEngine::new(config.clone(), Arc::new(notifier), localization));

    let bot = Bot::new(config.token.clone());

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(bot::message_handler))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![engine])
        .enable_ctrlc_handler()
        .build();

    match &config.deployment {
        Deployment::Polling => {
            info!("Bot initialized, starting long polling");
            dispatcher.dispatch().await;
        }
        Deployment::Webhook(settings) => {
            let address = SocketAddr::from(([0, 0, 0, 0], settings.port));
            let url = format!("https://{}/webhook", settings.host)
                .parse::<url::Url>()
                .context("Invalid webhook URL")?;

            let mut options = webhooks::Options::new(address, url);
            if let Some(secret) = &settings.secret {
                options = options.secret_token(secret.clone());
            }

            info!(host = %settings.host, port = settings.port, "Bot initialized, starting webhook listener");
            let listener = webhooks::axum(bot, options)
                .await
                .context("Failed to start webhook listener")?;

            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
