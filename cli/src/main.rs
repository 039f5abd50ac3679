//! jobdesk - terminal front-end for the jobs API
//!
//! # Usage
//!
//! ```bash
//! # Failed extraction jobs, second page
//! jobdesk list --status failed --type extract --page 2
//!
//! # Same view from a shared query string
//! jobdesk list --query "status=failed&type=extract&page=2"
//!
//! # Follow a job until it settles
//! jobdesk show 3f2a9c1e --watch
//! ```

use std::process::ExitCode;

use clap::Parser;

mod args;
mod commands;
mod error;
mod logging;
mod output;
mod prompt;

use args::{Cli, Command};
use commands::{Context, JobAction};
use error::Result;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(&cli)?;

    match cli.command {
        Command::List(args) => commands::list(&ctx, args).await,
        Command::Show { id, watch } => commands::show(&ctx, &id, watch).await,
        Command::Create(args) => commands::create(&ctx, args).await,
        Command::Start { id } => commands::job_action(&ctx, JobAction::Start, &id).await,
        Command::Cancel { id } => commands::job_action(&ctx, JobAction::Cancel, &id).await,
        Command::Retry { id } => commands::job_action(&ctx, JobAction::Retry, &id).await,
        Command::Delete { id, yes } => commands::delete(&ctx, &id, yes).await,
    }
}
