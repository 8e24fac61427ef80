mod cli;
mod config;
mod console;
mod validate;
mod workflow;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::console::Console;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load settings, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;
    if cli.verify_tls {
        cfg.api.verify_tls = true;
    }

    // 3. Logs go to stderr so they never interleave with the dialogue.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    if cfg.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }

    if cfg.source.is_none() {
        warn!(
            path = %cli.config.display(),
            "settings file not found; using defaults"
        );
    }

    info!(
        config_file = %cli.config.display(),
        offline = cli.config_xml.is_some(),
        verify_tls = cfg.api.verify_tls,
        "zone-swap starting"
    );

    // 4. Offline edit of an exported file, or a live session.
    let mut console = Console::stdio();
    match &cli.config_xml {
        Some(path) => workflow::run_offline(&mut console, &cfg, path),
        None => {
            workflow::run_live(
                &mut console,
                &cfg,
                cli.host.as_deref(),
                cli.user.as_deref(),
            )
            .await
        }
    }
}
