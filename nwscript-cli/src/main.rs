//! CLI front-end for the NWScript control-flow recovery pass.
//!
//! The pass itself lives in `nwscript-core`; this binary is the thin,
//! explicitly out-of-scope collaborator that loads a block graph and
//! prints the recovered control markers.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nwscript_core::analyze_control_flow;

mod graph;

#[derive(Parser)]
#[command(name = "nwscript-cfg")]
#[command(about = "NWScript structural control-flow recovery")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover control structures for a function's block graph.
    Analyze {
        /// Path to a JSON description of the function's blocks.
        #[arg(short, long)]
        graph_file: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { graph_file } => analyze(&graph_file),
    }
}

fn analyze(graph_file: &PathBuf) -> Result<()> {
    let raw = fs::read_to_string(graph_file)
        .with_context(|| format!("reading {}", graph_file.display()))?;
    let parsed: graph::GraphFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", graph_file.display()))?;

    let mut blocks = graph::load(parsed)?;

    analyze_control_flow(&mut blocks).context("control-flow analysis found a malformed CFG")?;

    for block in blocks.iter() {
        if block.controls.is_empty() {
            continue;
        }
        println!("block {:08X}:", block.address);
        for marker in &block.controls {
            println!("  {marker:?}");
        }
    }

    Ok(())
}
