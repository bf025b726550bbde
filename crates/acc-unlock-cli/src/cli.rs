use clap::{Args, Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "acc-unlock",
    about = "Find and release checked-out documents across an ACC project",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to `run` when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Walk the project, then unlock every reserved file.
    Run(RunArgs),
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Report locked files without unlocking them.
    #[arg(long)]
    pub dry_run: bool,
    /// Administrative user the unlocks are attributed to (overrides config).
    #[arg(long)]
    pub user_id: Option<String>,
    /// Maximum number of unlock requests in flight.
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Skip folders that cannot be listed instead of aborting the run.
    #[arg(long)]
    pub skip_failed_folders: bool,
    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
    /// Store the APS client secret in the OS keyring.
    SetSecret { secret: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_run_when_missing_subcommand() {
        let cli = Cli::try_parse_from(["acc-unlock"]).expect("parse should succeed");
        assert_eq!(cli.command, None);
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "acc-unlock",
            "run",
            "--dry-run",
            "--user-id",
            "200812345678",
            "--concurrency",
            "4",
            "--skip-failed-folders",
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Some(Command::Run(RunArgs {
                dry_run: true,
                user_id: Some("200812345678".into()),
                concurrency: Some(4),
                skip_failed_folders: true,
                json: false,
            }))
        );
    }

    #[test]
    fn parses_config_subcommands() {
        let cli = Cli::try_parse_from(["acc-unlock", "config", "init"]).expect("parse");
        assert_eq!(cli.command, Some(Command::Config(ConfigCommand::Init)));

        let cli = Cli::try_parse_from(["acc-unlock", "config", "set-secret", "s3cr3t"]).expect("parse");
        assert_eq!(
            cli.command,
            Some(Command::Config(ConfigCommand::SetSecret {
                secret: "s3cr3t".into()
            }))
        );
    }

    #[test]
    fn rejects_non_numeric_concurrency() {
        assert!(Cli::try_parse_from(["acc-unlock", "run", "--concurrency", "many"]).is_err());
    }
}
