use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "zone-swap",
    version,
    about = "Search and replace zones in firewall and Panorama rulebases"
)]
pub struct Cli {
    /// Exported firewall or Panorama configuration to edit offline. When
    /// omitted, the device is edited live through its management API.
    pub config_xml: Option<PathBuf>,

    /// Path to the settings file
    #[arg(short, long, default_value = "zone-swap.yaml")]
    pub config: PathBuf,

    /// Device IP address or FQDN (skips the address prompt)
    #[arg(long)]
    pub host: Option<String>,

    /// Username for the first login attempt
    #[arg(short, long)]
    pub user: Option<String>,

    /// Verify the device's TLS certificate (overrides settings file)
    #[arg(long)]
    pub verify_tls: bool,
}
