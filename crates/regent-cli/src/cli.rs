use std::io::{self, Write};

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::hash::{HashArgs, run_hash};
use crate::layout::{LayoutArgs, render_into};
use crate::poll::{PollArgs, poll_into};
use crate::table::{TableArgs, table_into};
use crate::tree::{TreeArgs, tree_into};

#[derive(Debug, Parser)]
#[command(
    name = "regentctl",
    about = "Drive server-rendered regions, trees and tables from the command line",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse or edit a location fragment offline.
    Hash(HashArgs),

    /// Render one region and print its content.
    Layout(LayoutArgs),

    /// Poll a renderer and print each reply.
    Poll(PollArgs),

    /// Load a tree and optionally open a node.
    Tree(TreeArgs),

    /// Page through a table.
    Table(TableArgs),
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with(cli, &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn run_with(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Commands::Hash(args) => run_hash(args, out),
        Commands::Layout(args) => {
            let ctx = args.connect.connect()?;
            render_into(&ctx, &args, out)
        }
        Commands::Poll(args) => {
            let ctx = args.connect.connect()?;
            poll_into(&ctx, &args, out).map(|_| ())
        }
        Commands::Tree(args) => {
            let ctx = args.connect.connect()?;
            tree_into(&ctx, &args, out)
        }
        Commands::Table(args) => {
            let ctx = args.connect.connect()?;
            table_into(&ctx, &args, out).map(|_| ())
        }
    }
}
