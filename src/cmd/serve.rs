/*!
`serve.rs`

Runs the HTTP gateway until Ctrl-C.

  patlite-gateway serve --listen 0.0.0.0:4567
*/

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use tracing::warn;

use crate::cmd::shared::build_state;
use crate::config::GatewayConfig;
use crate::server;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address (overrides config / PATLITE_LISTEN)
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<String>,
}

pub fn execute_serve(args: ServeArgs, mut cfg: GatewayConfig) -> Result<()> {
    if let Some(listen) = args.listen {
        cfg.listen = listen;
    }
    cfg.validate()?;
    if cfg.webhook.credentials().is_none() {
        warn!("no webhook credentials configured; /webhook will reject every request");
    }

    let state = Arc::new(build_state(&cfg)?);
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(server::serve(&cfg.listen, state))
}
