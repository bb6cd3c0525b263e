use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod http;
mod mutate;
mod utils;

use cmd::{FieldsArgs, ProbeArgs};

/// massprobe - mass-assignment probing for HTTP JSON APIs
///
/// Command layout:
///   massprobe probe  --fetch-from <URL> -t <URL> [options]
///   massprobe fields --fetch-from <URL> [options]
///
/// Notes:
///   - probe  : fetch a JSON object from the source, mutate each field
///              individually (flip booleans, increment integers, suffix
///              strings) and resubmit every mutation to the target,
///              reporting which ones the target accepts
///   - fields : dry run; list the mutations a probe run would submit
///
/// Global flags / env:
///   -v / -vv            Increase verbosity
///   -q / --quiet        Errors only
///   MASSPROBE_SOURCE    Fallback for --fetch-from
///   MASSPROBE_TARGET    Fallback for --target (probe only)
///
/// Examples:
///   massprobe probe --fetch-from https://api.example/users/1 \
///       -t https://api.example/users/1 -H "Authorization: Bearer ..."
///   massprobe probe --fetch-from ... -t ... --ignore-fields id,owner.id \
///       --rate-limit 2 --probe-method PATCH --json
///   massprobe fields --fetch-from https://api.example/users/1
///   massprobe fields --body '{"role":"user","admin":false}'
#[derive(Parser, Debug)]
#[command(
    name = "massprobe",
    version,
    author,
    about = "Probe HTTP JSON APIs for mass-assignment vulnerabilities",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, mutate field-by-field, and resubmit to the target
    Probe(ProbeArgs),

    /// List the mutations a probe run would submit (no target traffic)
    Fields(FieldsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match cli.command {
        Commands::Probe(args) => cmd::execute_probe(args),
        Commands::Fields(args) => cmd::execute_fields(args),
    }
}
