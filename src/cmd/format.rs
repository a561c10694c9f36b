/*!
format.rs

Human output helpers for the `encode` / `send` subcommands.

  - StyleOptions::detect() honours NO_COLOR and NO_EMOJI
  - color(role, text, &style) -> String
  - emoji(tag, &style) -> &'static str
  - key_value(label, value, &style) -> aligned line

JSON output paths do not use these helpers.
*/

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Accent,
    Success,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Accent => "\x1b[36m",
        Role::Success => "\x1b[32m",
        Role::Error => "\x1b[31m",
        Role::Dim => "\x1b[2m",
    };
    format!("{code}{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return match tag {
            "success" => "[ok]",
            "error" => "[x]",
            _ => "[i]",
        };
    }
    match tag {
        "success" => "✅",
        "error" => "❌",
        "light" => "🚨",
        _ => "ℹ️",
    }
}

/// `label` padded to a fixed column, value shown verbatim (empty -> `(none)`).
pub fn key_value(label: &str, value: &str, style: &StyleOptions) -> String {
    let shown = if value.is_empty() { "(none)" } else { value };
    format!("{} {}", color(Role::Accent, format!("{label:<10}"), style), shown)
}
