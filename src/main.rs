mod cli;
mod commands;
mod mcp;
mod output;
mod page_range;
mod pdf;
mod rh;
mod source;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, RhCommands};
use commands::split::SplitAt;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the MCP transport, so logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mcp => {
            mcp::run_server().await?;
        }
        Commands::Info { path, json } => {
            commands::info::run(&path, json)?;
        }
        Commands::Merge { inputs, output } => {
            commands::merge::run(&inputs, output)?;
        }
        Commands::Extract {
            path,
            pages,
            output,
        } => {
            commands::extract::run(&path, &pages, output)?;
        }
        Commands::Split {
            path,
            pages,
            every,
            output_dir,
        } => {
            let at = match (pages, every) {
                (Some(pages), _) => SplitAt::Pages(pages),
                (None, Some(n)) => SplitAt::Every(n),
                (None, None) => anyhow::bail!("Either --pages or --every is required"),
            };
            commands::split::run(&path, &at, output_dir)?;
        }
        Commands::Rotate {
            path,
            pages,
            degrees,
            output,
        } => {
            commands::rotate::run(&path, &pages, degrees, output)?;
        }
        Commands::Mix {
            first,
            second,
            output,
        } => {
            commands::mix::run(&first, &second, output)?;
        }
        Commands::Arrange { items, output } => {
            commands::arrange::run(&items, output)?;
        }
        Commands::Rh { command } => match command {
            RhCommands::Scan { root, months, json } => {
                commands::rh::scan(&root.root, root.year, &months.months, json)?;
            }
            RhCommands::Base {
                root,
                months,
                yes,
                combine,
            } => {
                commands::rh::base(&root.root, root.year, &months.months, yes, combine)?;
            }
            RhCommands::Bases { root } => {
                commands::rh::bases(&root)?;
            }
            RhCommands::Persons { root, months, json } => {
                commands::rh::persons(&root.root, root.year, &months.months, json)?;
            }
            RhCommands::Final {
                root,
                months,
                person,
            } => {
                commands::rh::final_docs(&root.root, root.year, &months.months, &person)?;
            }
        },
    }

    Ok(())
}
