//! Monitoring webhook -> device command translation.
//!
//! | event    | alert.status | command                    |
//! |----------|--------------|----------------------------|
//! | sample   | -            | test                       |
//! | alert    | critical     | alert r=1 z=1 sec=2        |
//! | alert    | warning      | alert y=1 z=1 sec=2        |
//! | alert    | ok           | alert g=1 z=1 sec=2        |
//!
//! Anything else translates to nothing.

use serde_json::Value;

use crate::patlite::{CommandName, OptionValue, Options};

/// Seconds the lamp/buzzer stays on for webhook-triggered alerts.
const WEBHOOK_ALERT_SECS: i64 = 2;

pub fn translate(payload: &Value) -> Option<(CommandName, Options)> {
    match payload.get("event").and_then(Value::as_str)? {
        "sample" => Some((CommandName::Test, Options::new())),
        "alert" => {
            let lamp = match payload.pointer("/alert/status").and_then(Value::as_str)? {
                "critical" => "r",
                "warning" => "y",
                "ok" => "g",
                _ => return None,
            };
            let options: Options = [
                (lamp, OptionValue::Int(1)),
                ("z", OptionValue::Int(1)),
                ("sec", OptionValue::Int(WEBHOOK_ALERT_SECS)),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
            Some((CommandName::Alert, options))
        }
        _ => None,
    }
}
