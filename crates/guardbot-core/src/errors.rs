/// Core error type for the guard bot.
///
/// Adapter crates map their specific errors into this type so the command
/// engine can tell a recoverable per-target rejection from a failure that
/// should abort the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),

    /// The platform refused because the bot (or the target's role) lacks the
    /// required admin rights.
    #[error("insufficient admin rights")]
    AdminRights,

    /// The user reference does not resolve to anyone the platform knows.
    #[error("invalid user reference")]
    InvalidUser,

    /// The platform rejected the requested slow-mode interval.
    #[error("invalid slow mode interval")]
    InvalidSlowMode,

    /// The chat is already being synchronized by another task.
    #[error("chat {0} is busy with another admin sync")]
    SyncBusy(i64),

    #[error("platform error: {0}")]
    Platform(String),
}

impl Error {
    /// Rejections that fail a single target of a moderation action; the rest
    /// of the batch keeps going.
    pub fn is_target_rejection(&self) -> bool {
        matches!(self, Error::AdminRights | Error::InvalidUser)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
