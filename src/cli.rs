//! Command-line interface parsing
//!
//! This module handles parsing of CLI arguments using clap and resolves them
//! into the effective paths and user list for a run, applying XDG defaults
//! for the configuration file and the cache directory.

use std::path::PathBuf;

use clap::Parser;
use directories::ProjectDirs;
use thiserror::Error;

/// Error types for resolving CLI arguments
#[derive(Debug, Error)]
pub enum CliError {
    /// Neither an explicit path nor a home directory to derive one from
    #[error("could not determine a home directory for default paths")]
    NoHomeDirectory,
}

/// Invite fellow Slack users into your tmate session
#[derive(Parser, Debug)]
#[command(name = "tmslack")]
#[command(about = "Invites fellow Slack users to your tmate session")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    ///
    /// Defaults to the XDG configuration location, e.g.
    /// ~/.config/tmslack/config.yml on Linux.
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Directory where lookup caches are kept
    ///
    /// Defaults to the XDG cache location, e.g. ~/.cache/tmslack on Linux.
    #[arg(long, value_name = "PATH")]
    pub cache_directory: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Slack users to invite; defaults to the user named in the configuration
    #[arg(value_name = "USER")]
    pub users: Vec<String>,
}

/// Effective paths and user list for a run, derived from CLI arguments
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Configuration file to load
    pub config_file: PathBuf,
    /// Directory holding the lookup caches
    pub cache_directory: PathBuf,
    /// Users named on the command line (may be empty)
    pub users: Vec<String>,
}

impl Invocation {
    /// Resolves parsed CLI arguments, filling in XDG defaults where needed.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let project_dirs = ProjectDirs::from("", "", "tmslack");

        let config_file = match &cli.config_file {
            Some(path) => path.clone(),
            None => project_dirs
                .as_ref()
                .ok_or(CliError::NoHomeDirectory)?
                .config_dir()
                .join("config.yml"),
        };
        let cache_directory = match &cli.cache_directory {
            Some(path) => path.clone(),
            None => project_dirs
                .as_ref()
                .ok_or(CliError::NoHomeDirectory)?
                .cache_dir()
                .to_path_buf(),
        };

        Ok(Self {
            config_file,
            cache_directory,
            users: cli.users.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["tmslack"]);
        assert!(cli.config_file.is_none());
        assert!(cli.cache_directory.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(cli.users.is_empty());
    }

    #[test]
    fn test_cli_parse_users_positional() {
        let cli = Cli::parse_from(["tmslack", "dan", "alice"]);
        assert_eq!(cli.users, vec!["dan", "alice"]);
    }

    #[test]
    fn test_cli_parse_paths_and_verbosity() {
        let cli = Cli::parse_from([
            "tmslack",
            "--config-file",
            "/tmp/config.yml",
            "--cache-directory",
            "/tmp/cache",
            "-vv",
        ]);
        assert_eq!(cli.config_file.as_deref(), Some("/tmp/config.yml".as_ref()));
        assert_eq!(cli.cache_directory.as_deref(), Some("/tmp/cache".as_ref()));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_invocation_keeps_explicit_paths() {
        let cli = Cli::parse_from([
            "tmslack",
            "--config-file",
            "/tmp/config.yml",
            "--cache-directory",
            "/tmp/cache",
            "dan",
        ]);
        let invocation = Invocation::from_cli(&cli).expect("Resolution should succeed");
        assert_eq!(invocation.config_file, PathBuf::from("/tmp/config.yml"));
        assert_eq!(invocation.cache_directory, PathBuf::from("/tmp/cache"));
        assert_eq!(invocation.users, vec!["dan"]);
    }

    #[test]
    fn test_invocation_defaults_are_project_scoped() {
        let cli = Cli::parse_from(["tmslack"]);
        // Skipped when no home directory can be determined (e.g. bare CI)
        if let Ok(invocation) = Invocation::from_cli(&cli) {
            assert!(invocation.config_file.ends_with("tmslack/config.yml"));
            assert!(invocation
                .cache_directory
                .to_string_lossy()
                .contains("tmslack"));
        }
    }
}
