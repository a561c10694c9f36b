/*!
shared.rs - helpers reused by serve / encode / send.

  - build_client(&GatewayConfig) -> PatliteClient
  - build_state(&GatewayConfig)  -> AppState
  - output_error(json, msg)      -> prints + returns Err
*/

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::cmd::format::{Role, StyleOptions, color, emoji};
use crate::config::GatewayConfig;
use crate::server::AppState;
use crate::transport::{PatliteClient, RemoteTarget, ShellExecutor};

/// Client backed by the real remote-shell executor.
pub fn build_client(cfg: &GatewayConfig) -> Result<PatliteClient> {
    let target = RemoteTarget::new(&cfg.invoker, &cfg.remote_user, &cfg.host)
        .context("failed to build remote target")?;
    let executor = Arc::new(ShellExecutor::new(cfg.timeout(), cfg.serialize));
    Ok(PatliteClient::new(target, executor))
}

pub fn build_state(cfg: &GatewayConfig) -> Result<AppState> {
    Ok(AppState {
        client: build_client(cfg)?,
        allowed_hosts: cfg.allowed_ranges()?,
        webhook_credentials: cfg
            .webhook
            .credentials()
            .map(|(u, p)| (u.to_string(), p.to_string())),
    })
}

pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

pub fn output_error(json: bool, msg: &str) -> Result<()> {
    if json {
        print_json(&serde_json::json!({ "status": "error", "error": msg }));
    } else {
        let style = StyleOptions::detect();
        println!("{} {}", emoji("error", &style), color(Role::Error, msg, &style));
    }
    anyhow::bail!(msg.to_string())
}
