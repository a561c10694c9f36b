/*!
registry.rs - static command grammar.

Per command:
  - option keys in emission order
  - full-match validation pattern per key
  - default values (alert only)

Everything here is a pure lookup over `'static` tables; nothing is
allocated per request; each pattern compiles once, on first use.
*/

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use super::encoder::OptionValue;

/* -------------------------------------------------------------------------- */
/* Command Names                                                              */
/* -------------------------------------------------------------------------- */

/// Operations understood by the signal light.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandName {
    /// Light lamps / sound buzzer
    Alert,
    /// Reset lamps and/or buzzer
    Clear,
    /// Query current device state
    Status,
    /// Run the device self test
    Test,
}

impl CommandName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::Alert => "alert",
            CommandName::Clear => "clear",
            CommandName::Status => "status",
            CommandName::Test => "test",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match against the fixed command set.
impl FromStr for CommandName {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        allowed_commands()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

/* -------------------------------------------------------------------------- */
/* Option Keys                                                                */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKey {
    /// Red lamp
    R,
    /// Yellow lamp
    Y,
    /// Green lamp
    G,
    /// Buzzer
    Z,
    /// Duration in seconds
    Sec,
    /// Lamps ("patlite") reset flag
    P,
}

impl OptionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::R => "r",
            OptionKey::Y => "y",
            OptionKey::G => "g",
            OptionKey::Z => "z",
            OptionKey::Sec => "sec",
            OptionKey::P => "p",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* -------------------------------------------------------------------------- */
/* Grammar Tables                                                             */
/* -------------------------------------------------------------------------- */

/// One (command, key) row of the grammar. Each row owns its matcher.
#[derive(Debug)]
pub struct Rule {
    pub key: OptionKey,
    regex: &'static LazyLock<Regex>,
    pub default: Option<u8>,
}

impl Rule {
    pub fn regex(&self) -> &'static Regex {
        LazyLock::force(self.regex)
    }

    /// Source text of the full-match pattern.
    pub fn pattern(&self) -> &'static str {
        self.regex().as_str()
    }
}

// Literal patterns; compiling them cannot fail at runtime.
static LAMP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[01239]$").unwrap());
static BUZZER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[012349]$").unwrap());
static SECONDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{0,2}$").unwrap());
static SWITCH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[01]$").unwrap());

static ALERT_RULES: &[Rule] = &[
    Rule { key: OptionKey::R, regex: &LAMP, default: Some(9) },
    Rule { key: OptionKey::Y, regex: &LAMP, default: Some(9) },
    Rule { key: OptionKey::G, regex: &LAMP, default: Some(9) },
    Rule { key: OptionKey::Z, regex: &BUZZER, default: Some(9) },
    Rule { key: OptionKey::Sec, regex: &SECONDS, default: Some(0) },
];

static CLEAR_RULES: &[Rule] = &[
    Rule { key: OptionKey::P, regex: &SWITCH, default: None },
    Rule { key: OptionKey::Z, regex: &SWITCH, default: None },
];

const ALERT_KEYS: &[OptionKey] = &[
    OptionKey::R,
    OptionKey::Y,
    OptionKey::G,
    OptionKey::Z,
    OptionKey::Sec,
];
const CLEAR_KEYS: &[OptionKey] = &[OptionKey::P, OptionKey::Z];

/* -------------------------------------------------------------------------- */
/* Lookups                                                                    */
/* -------------------------------------------------------------------------- */

pub const fn allowed_commands() -> &'static [CommandName] {
    &[
        CommandName::Alert,
        CommandName::Clear,
        CommandName::Status,
        CommandName::Test,
    ]
}

/// Full grammar rows for a command, in emission order.
pub fn rules_for(command: CommandName) -> &'static [Rule] {
    match command {
        CommandName::Alert => ALERT_RULES,
        CommandName::Clear => CLEAR_RULES,
        CommandName::Status | CommandName::Test => &[],
    }
}

/// Keys in canonical emission order. Order dictates output field order.
pub fn option_keys_for(command: CommandName) -> &'static [OptionKey] {
    match command {
        CommandName::Alert => ALERT_KEYS,
        CommandName::Clear => CLEAR_KEYS,
        CommandName::Status | CommandName::Test => &[],
    }
}

fn rule(command: CommandName, key: OptionKey) -> Option<&'static Rule> {
    rules_for(command).iter().find(|r| r.key == key)
}

pub fn pattern_for(command: CommandName, key: OptionKey) -> Option<&'static Regex> {
    rule(command, key).map(Rule::regex)
}

pub fn default_for(command: CommandName, key: OptionKey) -> Option<OptionValue> {
    rule(command, key)
        .and_then(|r| r.default)
        .map(|d| OptionValue::Int(i64::from(d)))
}

/* -------------------------------------------------------------------------- */
/* Tests                                                                      */
/* -------------------------------------------------------------------------- */
