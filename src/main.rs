// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::CookOptions;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { recipe, json } => commands::cmd_inspect(&recipe, json),

        Commands::PackageId {
            recipe,
            profile,
            verbose,
        } => commands::cmd_package_id(&recipe, &profile, verbose),

        Commands::Graph {
            recipes,
            levels,
            affected,
        } => commands::cmd_graph(&recipes, levels, affected.as_deref()),

        Commands::Cook {
            recipes,
            profile,
            root,
            jobs,
            timeout,
            cmake,
            generator,
            no_cache,
        } => commands::cmd_cook(
            &recipes,
            &profile,
            CookOptions {
                root,
                jobs,
                timeout,
                cmake,
                generator,
                no_cache,
            },
        ),

        Commands::CacheClear { root } => commands::cmd_cache_clear(root),
    }
}
