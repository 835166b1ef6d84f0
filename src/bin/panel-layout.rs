use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use panel_layout::common::config::Config;
use panel_layout::common::log;
use panel_layout::layout::NodeKind;
use panel_layout::persist;

#[derive(Parser)]
#[command(version, about = "Inspect and normalize panel layout documents")]
struct Cli {
    /// Path to configuration file to use (overrides the built-in defaults).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a layout document is well formed.
    Validate { file: PathBuf },
    /// Rewrite a document with every id and size filled in.
    Normalize {
        file: PathBuf,
        /// Write the result here instead of standard output.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print node counts and the panes of a document.
    Stats { file: PathBuf },
}

fn main() {
    log::init_logging();
    let opt = Cli::parse();

    let config = match &opt.config {
        Some(path) => Config::read(path).unwrap_or_else(|e| fail(e)),
        None => Config::builtin(),
    };
    let issues = config.validate();
    if !issues.is_empty() {
        for issue in issues {
            eprintln!("{issue}");
        }
        process::exit(1);
    }

    let result = match &opt.command {
        Commands::Validate { file } => validate(file, &config),
        Commands::Normalize { file, output } => normalize(file, output.as_deref(), &config),
        Commands::Stats { file } => stats(file, &config),
    };
    if let Err(e) = result {
        fail(e);
    }
}

fn fail(e: anyhow::Error) -> ! {
    eprintln!("error: {e:#}");
    process::exit(1);
}

fn validate(file: &Path, config: &Config) -> anyhow::Result<()> {
    let tree = persist::load(file, config)?;
    println!("{}: valid layout with {} panes", file.display(), tree.pane_count());
    Ok(())
}

fn normalize(file: &Path, output: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let tree = persist::load(file, config)?;
    match output {
        Some(path) => persist::save(&tree, path)
            .with_context(|| format!("saving {}", path.display()))?,
        None => println!("{}", tree.to_json_pretty()?),
    }
    Ok(())
}

fn stats(file: &Path, config: &Config) -> anyhow::Result<()> {
    let tree = persist::load(file, config)?;
    let kinds = [NodeKind::Layout, NodeKind::Row, NodeKind::Panel, NodeKind::Pane];
    let mut counts = [0usize; 4];
    let mut depth = 0;
    let mut stack = vec![(tree.root_id(), 1)];
    while let Some((id, level)) = stack.pop() {
        depth = depth.max(level);
        if let Some(kind) = tree.kind(id) {
            counts[kinds.iter().position(|&k| k == kind).unwrap_or_default()] += 1;
        }
        stack.extend(tree.children(id).into_iter().map(|child| (child, level + 1)));
    }

    for (kind, count) in std::iter::zip(kinds, counts) {
        println!("{:<8}{count}", format!("{kind}s"));
    }
    println!("{:<8}{depth}", "depth");
    for pane in tree.pane_ids() {
        let active = tree
            .parent(pane)
            .and_then(|panel| tree.active_pane(panel))
            .is_some_and(|active| active == pane);
        let marker = if active { "*" } else { " " };
        println!("{marker} {pane}  {}", tree.location(pane).unwrap_or_default());
    }
    Ok(())
}
