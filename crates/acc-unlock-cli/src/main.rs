mod cli;
mod config;
mod report;
mod run;
mod secrets;

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command.unwrap_or_else(|| cli::Command::Run(cli::RunArgs::default())) {
        cli::Command::Run(args) => run::run(&config, args).await?,
        cli::Command::Version => print_version(),
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
        cli::Command::Config(ConfigCommand::SetSecret { secret }) => set_secret(&config, &secret)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("acc-unlock {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

fn set_secret(config: &config::Config, secret: &str) -> Result<()> {
    let client_id = config::resolve_client_id(config, |key| std::env::var(key).ok())
        .ok_or_else(|| color_eyre::eyre::eyre!("set aps.client_id before storing its secret"))?;
    secrets::store_client_secret(&client_id, secret)?;
    println!("Stored client secret for {client_id} in the OS keyring");
    Ok(())
}
