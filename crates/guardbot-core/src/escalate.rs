//! Warning escalation: enough warnings inside the window turn the next one
//! into an automatic mute.

use chrono::Duration;

use crate::domain::{ChatId, ChatSettings, UserId, WarnType};
use crate::store::Store;
use crate::Result;

/// Mute duration to apply if recording one more warning now reaches the
/// chat's threshold, `None` otherwise.
///
/// The count is the raw WARN history inside `warn_counter_period`, taken
/// before the new record is written (`count + 1 >= warn_count`). A cascade
/// mute does not reset it, so every warning past the threshold triggers again
/// while the window still holds enough priors.
pub async fn mute_due(
    store: &dyn Store,
    settings: &ChatSettings,
    chat_id: ChatId,
    user_id: UserId,
) -> Result<Option<Duration>> {
    let count = store
        .count_warnings(chat_id, user_id, Some(WarnType::Warn), settings.warn_counter_period)
        .await?;
    if count + 1 >= settings.warn_count {
        Ok(Some(settings.mute_period))
    } else {
        Ok(None)
    }
}
