//! tmslack - Invite fellow Slack users into your tmate session
//!
//! Reads the bot token from a YAML configuration file, asks tmate for the
//! current session's SSH connection string, and direct-messages it to the
//! named users. Team identity and user-name lookups are cached on disk so
//! repeat invocations avoid redundant Slack API calls.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tmslack::cli::{Cli, Invocation};
use tmslack::{config, slack, tmate};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let invocation = Invocation::from_cli(&cli)?;
    let configuration = config::load(&invocation.config_file)?;
    let connection = tmate::ssh_connection()?;

    let mut client = slack::Client::connect(&configuration, &invocation.cache_directory)?;
    tracing::debug!(team = %client.info().team, "connected to Slack");

    let users = if invocation.users.is_empty() {
        vec![configuration.user.clone()]
    } else {
        invocation.users
    };

    for user in &users {
        client.invite(user, &connection)?;
        println!("Invited {user} to ssh {connection}");
    }
    Ok(())
}

/// Initializes log output to stderr; RUST_LOG overrides the -v flags.
fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
