//! keel CLI - Build orchestration for Go projects

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use keel::util::diagnostic::emit;
use keel::util::GlobalContext;
use keel::BuildError;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<BuildError>() {
            Some(build_error) => emit(&build_error.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut ctx = match cli.directory {
        Some(dir) => GlobalContext::with_cwd(dir),
        None => GlobalContext::new()?,
    };
    ctx.set_verbose(cli.verbose);
    ctx.set_dry_run(cli.dry_run);

    // Set up logging
    let filter = if ctx.is_verbose() {
        EnvFilter::new("keel=debug")
    } else {
        EnvFilter::new("keel=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(&ctx, args),
        Commands::Clean => commands::clean::execute(&ctx),
        Commands::Install => commands::install::execute(&ctx, false),
        Commands::Dev => commands::install::execute(&ctx, true),
        Commands::Generate => commands::generate::execute(&ctx),
        Commands::Prebuild(args) => commands::prebuild::execute(&ctx, args),
        Commands::Platforms => commands::platforms::execute(),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
