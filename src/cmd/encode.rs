/*!
`encode.rs`

Dry run: validate + encode a command without touching the device.

  patlite-gateway encode alert --opt r=1 --opt sec=5
  patlite-gateway encode clear --opt p=1 --json

JSON success:
{
  "status": "ok",
  "command": "alert",
  "options": "1 9 9 00 9 5",
  "command_line": "rsh -l patlite <host> alert 1 9 9 00 9 5"
}

JSON validation failure:
{
  "status": "error",
  "command": "alert",
  "parameter": { ... },
  "invalid": ["r"],
  "message": "r is invalid"
}
*/

use anyhow::Result;
use clap::Args;

use crate::cmd::format::{Role, StyleOptions, color, emoji, key_value};
use crate::cmd::shared::{output_error, print_json};
use crate::config::GatewayConfig;
use crate::patlite::{CommandName, encode};
use crate::transport::RemoteTarget;
use crate::utils::parse_kv_options;

/// Shown in the command line when no device host is configured.
const HOST_PLACEHOLDER: &str = "<host>";

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command to encode
    pub command: CommandName,

    /// Option (KEY=VALUE), repeatable
    #[arg(long = "opt", value_name = "KEY=VALUE")]
    pub opts: Vec<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_encode(args: EncodeArgs, cfg: &GatewayConfig) -> Result<()> {
    let options = match parse_kv_options(&args.opts) {
        Ok(o) => o,
        Err(e) => return output_error(args.json, &e.to_string()),
    };

    let encoded = match encode(args.command, &options) {
        Ok(e) => e,
        Err(err) => {
            if args.json {
                print_json(&serde_json::json!({
                    "status": "error",
                    "command": args.command,
                    "parameter": options,
                    "invalid": err.keys(),
                    "message": err.message(),
                }));
                anyhow::bail!(err);
            }
            return output_error(false, err.message());
        }
    };

    let host = if cfg.host.trim().is_empty() {
        HOST_PLACEHOLDER
    } else {
        cfg.host.as_str()
    };
    let target = RemoteTarget::new(&cfg.invoker, &cfg.remote_user, host)?;
    let line = target.display_line(&encoded);

    if args.json {
        print_json(&serde_json::json!({
            "status": "ok",
            "command": encoded.command(),
            "options": encoded.options(),
            "command_line": line,
        }));
    } else {
        let style = StyleOptions::detect();
        println!(
            "{} {}",
            emoji("success", &style),
            color(Role::Success, format!("{} is valid", encoded.command()), &style)
        );
        println!("{}", key_value("options", encoded.options(), &style));
        println!("{}", key_value("line", &line, &style));
        println!(
            "{} {}",
            emoji("info", &style),
            color(Role::Dim, "Dry run only; use `send` to execute.", &style)
        );
    }
    Ok(())
}
