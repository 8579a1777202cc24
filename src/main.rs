mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();
    cli::context::init(args.config.as_deref());

    let result = match &args.command {
        Commands::Audit {
            models,
            errors_only,
            cache_results,
        } => cli::commands::audit::execute(models, *errors_only, *cache_results, args.verbose),
        Commands::Report { models } => cli::commands::report::execute(models),
        Commands::Status => cli::commands::status::execute(args.verbose),
    };

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}
