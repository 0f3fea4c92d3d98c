//! Rule-driven extraction of command arguments from free-text messages.
//!
//! Every command goes through the same single parsing layer: an ordered rule
//! set is applied to the head of the message, each match is cut out of the
//! remaining text, and whatever survives all rules becomes the comment.

use std::collections::BTreeMap;

use regex::Regex;

/// Field name the unmatched leftover is stored under.
pub const COMMENT: &str = "comment";

/// One alternative of a list rule. An explicit `name` stores the capture
/// under its own field instead of the rule's.
pub struct Alt {
    pub name: Option<&'static str>,
    pub re: Regex,
}

/// A single extraction rule.
pub enum Rule {
    /// One pattern with one capture group, matched once against the head of
    /// the remaining text. Stores a scalar, overwriting a previous value.
    Single(Regex),
    /// Alternatives tried in order, round after round, until a full round
    /// matches nothing. Repeated captures under one field accumulate into a
    /// sequence.
    List(Vec<Alt>),
}

/// Ordered rule set: rules apply strictly in declaration order.
pub struct RuleSet {
    rules: Vec<(&'static str, Rule)>,
}

/// An extracted field: scalar until the same field captures twice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    One(String),
    Many(Vec<String>),
}

impl Value {
    fn push(&mut self, item: String) {
        match self {
            Value::One(first) => {
                *self = Value::Many(vec![std::mem::take(first), item]);
            }
            Value::Many(items) => items.push(item),
        }
    }

    pub fn first(&self) -> &str {
        match self {
            Value::One(s) => s,
            Value::Many(items) => items.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            Value::One(s) => vec![s],
            Value::Many(items) => items,
        }
    }
}

/// Extraction result, field name to captured value(s).
pub type Extracted = BTreeMap<&'static str, Value>;

impl RuleSet {
    pub fn new(rules: Vec<(&'static str, Rule)>) -> Self {
        Self { rules }
    }

    /// Apply the rules in order against `text`; the trimmed leftover, if any,
    /// lands under [`COMMENT`].
    pub fn extract(&self, text: &str) -> Extracted {
        let mut out = Extracted::new();
        let mut rest = text;

        for &(field, ref rule) in &self.rules {
            match rule {
                Rule::Single(re) => {
                    if let Some((end, capture)) = match_head(re, rest) {
                        out.insert(field, Value::One(capture.to_string()));
                        rest = &rest[end..];
                    }
                }
                Rule::List(alts) => {
                    'rounds: loop {
                        for alt in alts {
                            if let Some((end, capture)) = match_head(&alt.re, rest) {
                                store(&mut out, alt.name.unwrap_or(field), capture.to_string());
                                rest = rest[end..].trim_start();
                                continue 'rounds;
                            }
                        }
                        break;
                    }
                }
            }
            rest = rest.trim_start();
        }

        let rest = rest.trim();
        if !rest.is_empty() {
            out.insert(COMMENT, Value::One(rest.to_string()));
        }
        out
    }
}

fn store(out: &mut Extracted, field: &'static str, capture: String) {
    match out.get_mut(field) {
        Some(value) => value.push(capture),
        None => {
            out.insert(field, Value::One(capture));
        }
    }
}

/// Match anchored at the start of `s`; returns the end of the whole match and
/// the first capture group.
fn match_head<'t>(re: &Regex, s: &'t str) -> Option<(usize, &'t str)> {
    let caps = re.captures(s)?;
    let whole = caps.get(0)?;
    if whole.start() != 0 {
        return None;
    }
    let capture = caps.get(1).map(|g| g.as_str()).unwrap_or("");
    Some((whole.end(), capture))
}

// The command grammar. Three user-reference spellings (deep link, @handle,
// #id) and two spellings per time unit.
const COMMAND_RE: &str = r"(?i)!(\w+)";
const TG_USER_RE: &str = r"(?i)\[[^\]]*\]\(tg:/+\w+\?id=(\d+)\)";
const DOG_USER_RE: &str = r"(?i)(@\w+)";
const SHARP_USER_RE: &str = r"(?i)#(\d+)";
const HOURS_RE: &str = r"(?i)(\d+)(hr|h)+";
const MINUTES_RE: &str = r"(?i)(\d+)(min|m)+";
const DAYS_RE: &str = r"(?i)(\d+)(days|d)+";

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

fn user_alts() -> Vec<Alt> {
    vec![
        Alt { name: None, re: re(TG_USER_RE) },
        Alt { name: None, re: re(DOG_USER_RE) },
        Alt { name: None, re: re(SHARP_USER_RE) },
    ]
}

fn period_alts() -> Vec<Alt> {
    vec![
        Alt { name: Some("hours"), re: re(HOURS_RE) },
        Alt { name: Some("minutes"), re: re(MINUTES_RE) },
        Alt { name: Some("days"), re: re(DAYS_RE) },
    ]
}

/// `!command @user #123 …` — command plus user references.
pub fn users_rules() -> RuleSet {
    RuleSet::new(vec![
        ("command", Rule::Single(re(COMMAND_RE))),
        ("users", Rule::List(user_alts())),
    ])
}

/// `!command @user 1d 2h 3m …` — command, user references, time period.
pub fn users_and_period_rules() -> RuleSet {
    RuleSet::new(vec![
        ("command", Rule::Single(re(COMMAND_RE))),
        ("users", Rule::List(user_alts())),
        ("period", Rule::List(period_alts())),
    ])
}

/// `!command 1h …` — command plus time period, no user references.
pub fn period_rules() -> RuleSet {
    RuleSet::new(vec![
        ("command", Rule::Single(re(COMMAND_RE))),
        ("period", Rule::List(period_alts())),
    ])
}

/// `!command` alone, for commands that take no arguments.
pub fn command_rules() -> RuleSet {
    RuleSet::new(vec![("command", Rule::Single(re(COMMAND_RE)))])
}

/// Typed view over an extraction result, as the moderation actions consume
/// it. Absent fields are defaults, never errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandArgs {
    pub command: Option<String>,
    pub users: Vec<String>,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub comment: Option<String>,
}

impl CommandArgs {
    pub fn from_extracted(mut extracted: Extracted) -> Self {
        fn number(extracted: &mut Extracted, field: &str) -> i64 {
            extracted
                .remove(field)
                .and_then(|v| v.first().parse().ok())
                .unwrap_or(0)
        }

        let days = number(&mut extracted, "days");
        let hours = number(&mut extracted, "hours");
        let minutes = number(&mut extracted, "minutes");

        Self {
            command: extracted.remove("command").map(|v| v.first().to_string()),
            users: extracted.remove("users").map(Value::into_vec).unwrap_or_default(),
            days,
            hours,
            minutes,
            comment: extracted.remove(COMMENT).map(|v| v.first().to_string()),
        }
    }

    /// days·24h + hours + minutes; zero means "until manually undone".
    pub fn period(&self) -> chrono::Duration {
        chrono::Duration::days(self.days)
            + chrono::Duration::hours(self.hours)
            + chrono::Duration::minutes(self.minutes)
    }
}
