use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tracing::{error, info};

use guardbot_core::{
    config::Config,
    engine::Engine,
    ports::Platform,
    roster::{RosterSync, SyncLocks},
    store::Store,
};

use crate::handlers;
use crate::TelegramPlatform;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Build the bot, spawn the periodic roster sweep, and run long polling
/// until the process is stopped.
pub async fn run_polling(cfg: Arc<Config>, store: Arc<dyn Store>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!(username = %me.username(), "guardbot started");
    }

    let platform: Arc<dyn Platform> = Arc::new(TelegramPlatform::new(bot.clone()));
    let locks = SyncLocks::new(cfg.lock_timeout, cfg.lock_poll);

    let roster = RosterSync::new(
        platform.clone(),
        store.clone(),
        locks.clone(),
        cfg.chat_cooldown,
        cfg.sweep_interval,
    );
    tokio::spawn(async move {
        if let Err(e) = roster.run().await {
            error!(error = %e, "admin refresh task terminated");
        }
    });

    let state = Arc::new(AppState {
        engine: Arc::new(Engine::new(platform, store, locks)),
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_edited_message().endpoint(handlers::handle_edited_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
