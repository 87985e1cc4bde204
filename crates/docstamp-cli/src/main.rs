//! # docstamp CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docstamp_cli::job::{run_job, JobArgs};
use docstamp_cli::stamp::{run_stamp, StampArgs};

/// Document stamping operator tool.
///
/// Runs stamping jobs synchronously against the Postgres catalog and
/// ledger, and inspects job state. Reads the same environment variables as
/// the HTTP service.
#[derive(Parser, Debug)]
#[command(name = "docstamp", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stamp documents and wait for the job to finish.
    Stamp(StampArgs),

    /// Show a stamping job and its provenance.
    Job(JobArgs),
}

fn filter_for(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(filter_for(cli.verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match docstamp_cli::pipeline_from_env().await {
        Ok(pipeline) => match &cli.command {
            Commands::Stamp(args) => run_stamp(args, &pipeline).await,
            Commands::Job(args) => run_job(args, &pipeline).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use docstamp_cli::stamp::StampCommand;

    use super::*;

    #[test]
    fn parse_stamp_documents() {
        let cli = Cli::try_parse_from(["docstamp", "stamp", "documents", "d-1", "d-2"]).unwrap();
        let Commands::Stamp(args) = cli.command else {
            panic!("expected stamp");
        };
        assert!(matches!(
            args.command,
            StampCommand::Documents { ref ids } if ids == &["d-1", "d-2"]
        ));
    }

    #[test]
    fn parse_stamp_agenda_with_verbosity() {
        let cli = Cli::try_parse_from(["docstamp", "-vv", "stamp", "agenda", "a-1"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Stamp(args) = cli.command else {
            panic!("expected stamp");
        };
        assert!(matches!(args.command, StampCommand::Agenda { ref id } if id == "a-1"));
    }

    #[test]
    fn stamp_documents_requires_ids() {
        assert!(Cli::try_parse_from(["docstamp", "stamp", "documents"]).is_err());
    }

    #[test]
    fn parse_job() {
        let cli = Cli::try_parse_from(["docstamp", "job", "6f1c2d0e-8a7b-4c3d-9e5f-102030405060"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Job(_)));
    }
}
