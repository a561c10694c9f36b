/*!
`send.rs`

One-shot execution: encode a command and run it against the device,
printing the device's reply.

  patlite-gateway send alert --opt r=1 --opt z=1 --opt sec=2
  patlite-gateway send status --json
*/

use anyhow::{Context, Result};
use clap::Args;
use std::time::Instant;

use crate::cmd::format::{Role, StyleOptions, color, emoji, key_value};
use crate::cmd::shared::{build_client, output_error, print_json};
use crate::config::GatewayConfig;
use crate::patlite::{CommandName, encode};
use crate::utils::parse_kv_options;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Command to run
    pub command: CommandName,

    /// Option (KEY=VALUE), repeatable
    #[arg(long = "opt", value_name = "KEY=VALUE")]
    pub opts: Vec<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_send(args: SendArgs, cfg: &GatewayConfig) -> Result<()> {
    if let Err(e) = cfg.validate() {
        return output_error(args.json, &e.to_string());
    }
    let options = match parse_kv_options(&args.opts) {
        Ok(o) => o,
        Err(e) => return output_error(args.json, &e.to_string()),
    };
    let encoded = match encode(args.command, &options) {
        Ok(e) => e,
        Err(err) => return output_error(args.json, err.message()),
    };

    let client = build_client(cfg)?;
    let started = Instant::now();
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let result = rt.block_on(client.run(&encoded));
    let elapsed_ms = started.elapsed().as_millis();

    let output = match result {
        Ok(out) => out,
        Err(e) => return output_error(args.json, &e.to_string()),
    };

    if args.json {
        print_json(&serde_json::json!({
            "status": "success",
            "command": encoded.command(),
            "host": client.target().host(),
            "user": client.target().user(),
            "command_line": client.target().display_line(&encoded),
            "elapsed_ms": elapsed_ms,
            "patlite_result": output,
        }));
    } else {
        let style = StyleOptions::detect();
        println!(
            "{} {}",
            emoji("light", &style),
            color(Role::Success, format!("{} sent ({elapsed_ms} ms)", encoded.command()), &style)
        );
        println!("{}", key_value("line", &client.target().display_line(&encoded), &style));
        println!("{}", key_value("reply", output.trim_end(), &style));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_without_host() {
        let cfg = GatewayConfig::default();
        let args = SendArgs {
            command: CommandName::Status,
            opts: vec![],
            json: true,
        };
        let err = execute_send(args, &cfg).unwrap_err();
        assert!(err.to_string().contains("no device host"));
    }

    #[test]
    fn runs_through_configured_invoker() {
        // `echo` stands in for rsh so the full path runs without a device.
        let mut cfg = GatewayConfig::default();
        cfg.host = "device".into();
        cfg.invoker = "echo".into();
        let args = SendArgs {
            command: CommandName::Clear,
            opts: vec!["p=1".into()],
            json: true,
        };
        assert!(execute_send(args, &cfg).is_ok());
    }

    #[test]
    fn invalid_options_never_run() {
        let mut cfg = GatewayConfig::default();
        cfg.host = "device".into();
        cfg.invoker = "definitely-not-a-real-binary-xyz".into();
        let args = SendArgs {
            command: CommandName::Alert,
            opts: vec!["sec=abc".into()],
            json: true,
        };
        let err = execute_send(args, &cfg).unwrap_err();
        assert_eq!(err.to_string(), "sec is invalid");
    }
}
