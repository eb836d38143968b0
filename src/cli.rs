use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_SETTINGS_FILE: &str = "setup-wizard-settings.json";

/// Setup Wizard - first-boot device setup
#[derive(Parser)]
#[command(name = "setup-wizard")]
#[command(about = "First-boot setup wizard driven from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the wizard with the console host
    Run(RunArgs),
    /// Run one captive-portal probe and print the verdict
    Probe {
        /// Probe server host name (defaults to the configured server)
        #[arg(short, long)]
        server: Option<String>,

        /// Connect and read timeout in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },
    /// Summarize a saved state file
    Inspect {
        /// Path to the saved state JSON
        file: PathBuf,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Wizard configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Platform settings file (JSON, created if missing)
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Saved state file; resumes from it when present
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Run as a guest user
    #[arg(long)]
    pub guest: bool,

    /// Offer the account page with a stand-in authenticator
    #[arg(long)]
    pub with_account: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            config: None,
            settings: PathBuf::from(DEFAULT_SETTINGS_FILE),
            state: None,
            guest: false,
            with_account: false,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "setup-wizard",
            "run",
            "--state",
            "/tmp/state.json",
            "--guest",
        ])
        .unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert!(args.guest);
        assert_eq!(args.state, Some(PathBuf::from("/tmp/state.json")));
        assert_eq!(args.settings, PathBuf::from("setup-wizard-settings.json"));
    }

    #[test]
    fn test_parse_probe() {
        let cli = Cli::try_parse_from(["setup-wizard", "probe", "-s", "example.org", "-t", "500"])
            .unwrap();
        match cli.command {
            Some(Commands::Probe { server, timeout_ms }) => {
                assert_eq!(server.as_deref(), Some("example.org"));
                assert_eq!(timeout_ms, Some(500));
            }
            _ => panic!("expected probe"),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
