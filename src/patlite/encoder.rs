/*!
encoder.rs - validate an option map against the grammar and serialize it.

  encode(command, &options) -> Result<EncodedCommand, ValidationError>

Validation walks the registry's key order once, partitions into accepted
values and offending keys, then branches on the offending list. It never
stops at the first failure.
*/

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::registry::{CommandName, OptionKey, default_for, option_keys_for, pattern_for};

/// Fixed hardware protocol field placed between the green lamp and the buzzer.
pub const ALERT_RESERVED_FIELD: &str = "00";

/* -------------------------------------------------------------------------- */
/* Values                                                                     */
/* -------------------------------------------------------------------------- */

/// Raw scalar supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Str(String),
}

impl OptionValue {
    /// String form used for matching and emission.
    pub fn canonical(&self) -> String {
        match self {
            OptionValue::Int(n) => n.to_string(),
            OptionValue::Str(s) => s.clone(),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Str(s)
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        OptionValue::Int(n)
    }
}

/// Caller-supplied options keyed by raw key name. Keys outside the
/// command's grammar are carried but never read.
pub type Options = BTreeMap<String, OptionValue>;

/* -------------------------------------------------------------------------- */
/* Results                                                                    */
/* -------------------------------------------------------------------------- */

/// A validated command and its transport argument string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    command: CommandName,
    options: String,
}

impl EncodedCommand {
    pub fn command(&self) -> CommandName {
        self.command
    }

    /// Encoded options string (may be empty).
    pub fn options(&self) -> &str {
        &self.options
    }

    /// Options as individual wire fields. Validated values never contain a
    /// space, so splitting on single spaces restores them exactly, empty
    /// fields included.
    pub fn fields(&self) -> Vec<&str> {
        if self.options.is_empty() {
            Vec::new()
        } else {
            self.options.split(' ').collect()
        }
    }
}

impl fmt::Display for EncodedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.options.is_empty() {
            write!(f, "{}", self.command)
        } else {
            write!(f, "{} {}", self.command, self.options)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    keys: Vec<OptionKey>,
    message: String,
}

impl ValidationError {
    fn new(keys: Vec<OptionKey>) -> Self {
        let verb = if keys.len() == 1 { "is" } else { "are" };
        let names: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        let message = format!("{} {} invalid", names.join(" "), verb);
        Self { keys, message }
    }

    /// Offending keys in registry order.
    pub fn keys(&self) -> &[OptionKey] {
        &self.keys
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/* -------------------------------------------------------------------------- */
/* Encoding                                                                   */
/* -------------------------------------------------------------------------- */

pub fn encode(command: CommandName, options: &Options) -> Result<EncodedCommand, ValidationError> {
    let accepted = validate(command, options)?;
    let options = match command {
        CommandName::Alert => serialize_alert(&accepted),
        CommandName::Clear => serialize_clear(&accepted),
        CommandName::Status | CommandName::Test => String::new(),
    };
    Ok(EncodedCommand { command, options })
}

/// Resolve the value to check for `key`: caller value first, then the
/// registry default. `None` means the key contributes nothing.
fn resolve(command: CommandName, key: OptionKey, options: &Options) -> Option<String> {
    options
        .get(key.as_str())
        .cloned()
        .or_else(|| default_for(command, key))
        .map(|v| v.canonical())
}

fn validate(
    command: CommandName,
    options: &Options,
) -> Result<Vec<(OptionKey, String)>, ValidationError> {
    let mut accepted = Vec::new();
    let mut invalid = Vec::new();

    for &key in option_keys_for(command) {
        let Some(value) = resolve(command, key, options) else {
            continue;
        };
        let matched = pattern_for(command, key).is_some_and(|p| p.is_match(&value));
        if matched {
            accepted.push((key, value));
        } else {
            invalid.push(key);
        }
    }

    if invalid.is_empty() {
        Ok(accepted)
    } else {
        Err(ValidationError::new(invalid))
    }
}

// Defaults guarantee every alert key is present once validation passes.
fn serialize_alert(accepted: &[(OptionKey, String)]) -> String {
    let field = |key: OptionKey| {
        accepted
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    };
    [
        field(OptionKey::R),
        field(OptionKey::Y),
        field(OptionKey::G),
        ALERT_RESERVED_FIELD,
        field(OptionKey::Z),
        field(OptionKey::Sec),
    ]
    .join(" ")
}

fn serialize_clear(accepted: &[(OptionKey, String)]) -> String {
    accepted
        .iter()
        .filter(|(_, v)| v == "1")
        .map(|(k, _)| format!("-{k}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/* -------------------------------------------------------------------------- */
/* Tests                                                                      */
/* -------------------------------------------------------------------------- */
