use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration, loaded from environment variables (a local `.env`
/// file is read first without overriding the real environment).
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub database_path: PathBuf,

    /// Pause between two full roster sweeps.
    pub sweep_interval: Duration,
    /// Pause between two chats within one sweep.
    pub chat_cooldown: Duration,

    /// How long a roster sync waits for the per-chat lock before giving up.
    pub lock_timeout: Duration,
    /// Poll interval while waiting for the per-chat lock.
    pub lock_poll: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let database_path =
            PathBuf::from(env_str("DATABASE_PATH").unwrap_or("guardbot.db".to_string()));

        let sweep_interval = Duration::from_secs(env_u64("ADMIN_REFRESH_PERIOD").unwrap_or(10) * 60);
        let chat_cooldown = Duration::from_secs(env_u64("SYNC_COOLDOWN").unwrap_or(5));

        let lock_timeout = Duration::from_secs_f64(env_f64("SYNC_LOCK_TIMEOUT").unwrap_or(1.0));
        let lock_poll = Duration::from_secs_f64(env_f64("SYNC_LOCK_POLL").unwrap_or(0.1));

        Ok(Self {
            bot_token,
            database_path,
            sweep_interval,
            chat_cooldown,
            lock_timeout,
            lock_poll,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    env_str(key)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let value = v.trim().trim_matches('"').trim_matches('\'');
        env::set_var(key, value);
    }
}
