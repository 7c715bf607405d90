//! Portcullis CLI - starts the gateway from a YAML config file.

use clap::Parser;
use portcullis::app::PortcullisApp;
use portcullis::config::GatewayConfig;
use tracing::error;

#[derive(Parser)]
#[command(name = "portcullis", about = "Signed-URL object cache gateway")]
struct Cli {
    /// Path to the YAML config file.
    #[arg(short = 'c', long = "config", default_value = "./config.yaml")]
    config: std::path::PathBuf,
}

#[tokio::main]
async fn main() {
    portcullis::telemetry::init();

    let cli = Cli::parse();

    let config = match GatewayConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!(path = %cli.config.display(), error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let app = match PortcullisApp::bootstrap(config) {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "failed to start gateway");
            std::process::exit(1);
        }
    };

    if let Err(e) = app.serve().await {
        error!(error = %e, "gateway exited with error");
        std::process::exit(1);
    }
}
