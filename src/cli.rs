use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ruyi-backend")]
#[command(about = "CLI management client for RuyiSDK backend services", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (TOML); environment variables override its values
    #[arg(long, global = true, env = "RUYI_BACKEND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Utilities for working with passwords
    Password {
        #[command(subcommand)]
        action: PasswordCommand,
    },

    /// Release worker: sync releases from GitHub to the configured rsync destination
    SyncReleases {
        /// GitHub repository to mirror (owner/name), overriding the configured one
        #[arg(long)]
        repo: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommand {
    /// Hash a password for storage
    Hash,

    /// Test a password against a generated hash
    Test {
        /// The hash to test against
        #[arg(long)]
        hash: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_releases() {
        let cli = Cli::try_parse_from(["ruyi-backend", "-v", "sync-releases", "--repo", "foo/bar"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::SyncReleases { repo } => assert_eq!(repo.as_deref(), Some("foo/bar")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_password_test_requires_hash() {
        assert!(Cli::try_parse_from(["ruyi-backend", "password", "test"]).is_err());

        let cli = Cli::try_parse_from(["ruyi-backend", "password", "test", "--hash", "x"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Password {
                action: PasswordCommand::Test { ref hash }
            } if hash == "x"
        ));
    }
}
