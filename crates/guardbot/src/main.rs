use std::sync::Arc;

use guardbot_core::{config::Config, logging, store::Store};
use guardbot_store::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), guardbot_core::Error> {
    logging::init("guardbot");

    let cfg = Arc::new(Config::load()?);
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&cfg.database_path)?);

    guardbot_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| guardbot_core::Error::Platform(format!("telegram bot failed: {e}")))?;

    Ok(())
}
