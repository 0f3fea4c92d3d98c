//! Reply vocabulary. The exact strings are part of the bot's contract with
//! its chats; tests assert them verbatim.

use chrono::Duration;

pub const WRONG_COMMAND: &str = "wat?";
pub const SLOW_MODE_ON: &str = "Slow mode on.";
pub const SLOW_MODE_OFF: &str = "Slow mode off.";

/// Render a user reference: numeric ids become a `tg://user` deep link, an
/// already-prefixed handle stays as-is.
pub fn user_link(user: &str) -> String {
    if !user.is_empty() && user.chars().all(|c| c.is_ascii_digit()) {
        format!("[{user}](tg://user?id={user})")
    } else {
        user.to_string()
    }
}

/// `User {ref} {action}`, with ` on {duration}` when the duration is bounded.
pub fn acted(user_link: &str, action: &str, period: Duration) -> String {
    if period > Duration::zero() {
        format!("User {user_link} {action} on {}", format_period(period))
    } else {
        format!("User {user_link} {action}")
    }
}

/// `User {ref} not {action}` — the per-target failure line.
pub fn not_acted(user_link: &str, action: &str) -> String {
    format!("User {user_link} not {action}")
}

pub fn warned(user_link: &str) -> String {
    format!("User {user_link} warned")
}

pub fn warns_deleted(user_link: &str, remaining: i64) -> String {
    format!("User warnings was delete for {user_link}. Current count: {remaining}")
}

pub fn reason(comment: &str) -> String {
    format!("Reason: {comment}")
}

/// Compact `1d 2h 3m` rendering; zero components are omitted.
pub fn format_period(period: Duration) -> String {
    let total_minutes = period.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if parts.is_empty() {
        return "0m".to_string();
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_reference_becomes_deep_link() {
        assert_eq!(user_link("123"), "[123](tg://user?id=123)");
        assert_eq!(user_link("@handle"), "@handle");
        assert_eq!(user_link(""), "");
    }

    #[test]
    fn period_rendering_omits_zero_components() {
        assert_eq!(
            format_period(Duration::days(1) + Duration::hours(2) + Duration::minutes(3)),
            "1d 2h 3m"
        );
        assert_eq!(format_period(Duration::days(1)), "1d");
        assert_eq!(format_period(Duration::minutes(30)), "30m");
    }

    #[test]
    fn acted_appends_duration_only_when_bounded() {
        assert_eq!(
            acted("[123](tg://user?id=123)", "banned", Duration::zero()),
            "User [123](tg://user?id=123) banned"
        );
        assert_eq!(
            acted("[123](tg://user?id=123)", "muted", Duration::hours(2)),
            "User [123](tg://user?id=123) muted on 2h"
        );
        assert_eq!(
            not_acted("@u", "kicked"),
            "User @u not kicked"
        );
    }
}
