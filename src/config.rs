/*!
config.rs - gateway configuration.

Precedence (lowest first):
  1. GatewayConfig::default()
  2. YAML file (--config / PATLITE_CONFIG)
  3. PATLITE_* environment variables
  4. CLI flags (applied by the caller)
*/

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::server::gate::IpRange;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:4567";
pub const DEFAULT_REMOTE_USER: &str = "patlite";
pub const DEFAULT_INVOKER: &str = "rsh";

/// Private and loopback ranges admitted to the webhook by default.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "127.0.0.0/8",
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "::1/128",
];

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub listen: String,
    /// Device host name or address. Required to execute anything.
    pub host: String,
    pub remote_user: String,
    /// Remote-shell program plus leading arguments, shell-split.
    pub invoker: String,
    pub timeout_secs: u64,
    /// Run device invocations one at a time.
    pub serialize: bool,
    pub allowed_hosts: Vec<String>,
    pub webhook: WebhookAuth,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookAuth {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl WebhookAuth {
    /// Both halves present, or nothing.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            host: String::new(),
            remote_user: DEFAULT_REMOTE_USER.to_string(),
            invoker: DEFAULT_INVOKER.to_string(),
            timeout_secs: 10,
            serialize: false,
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|s| s.to_string()).collect(),
            webhook: WebhookAuth::default(),
            log_file: None,
        }
    }
}

impl GatewayConfig {
    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("invalid config file: {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("failed to parse YAML config")
    }

    /// Overlay `PATLITE_*` variables. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("PATLITE_LISTEN") {
            self.listen = v;
        }
        if let Some(v) = get("PATLITE_HOST") {
            self.host = v;
        }
        if let Some(v) = get("PATLITE_RUSER") {
            self.remote_user = v;
        }
        if let Some(v) = get("PATLITE_INVOKER") {
            self.invoker = v;
        }
        if let Some(v) = get("PATLITE_WEBHOOK_USER") {
            self.webhook.user = Some(v);
        }
        if let Some(v) = get("PATLITE_WEBHOOK_PASSWORD") {
            self.webhook.password = Some(v);
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn allowed_ranges(&self) -> Result<Vec<IpRange>> {
        self.allowed_hosts
            .iter()
            .map(|s| s.parse::<IpRange>().with_context(|| format!("invalid allowed host range '{s}'")))
            .collect()
    }

    /// Checks needed before anything is sent to the device.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("no device host configured (set PATLITE_HOST or `host` in the config file)");
        }
        if self.remote_user.trim().is_empty() {
            bail!("remote user is empty");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        self.allowed_ranges()?;
        Ok(())
    }
}
