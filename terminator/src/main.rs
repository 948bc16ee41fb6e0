use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use terminator::config::Config;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "terminator")]
#[command(bin_name = "terminator")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Path to the configuration file.
    /// Defaults are used when omitted.
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Only watch Sidecar resources in this namespace.
    /// Overrides watchNamespace from the configuration file.
    #[arg(short, long)]
    namespace: Option<String>,

    /// Maximum number of Sidecars reconciled concurrently.
    /// Overrides concurrency from the configuration file.
    #[arg(long)]
    concurrency: Option<u16>,

    /// The most verbose level that is logged.
    /// Example: "debug"
    #[arg(long, default_value = "info")]
    log_level: Level,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config_file {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load configuration file {path:?}"))?,
            None => Config::default(),
        };

        if let Some(namespace) = &self.namespace {
            config.watch_namespace = Some(namespace.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse the CLI arguments
    let args = Args::try_parse()?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Parsed CLI arguments: {:?}", args);

    let config = args.load_config()?;
    info!("Loaded configuration: {:?}", config);

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    terminator::controller::run(client, &config).await?;

    info!("Exiting");
    Ok(())
}
