use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use hintkeys::config::Config;
use hintkeys::dispatch::{Dispatcher, KeyEvent};
use hintkeys::engine::ShortcutEngine;
use hintkeys::tree::ElementTree;
use hintkeys::tree::memory::MemoryTree;

#[derive(Parser, Debug)]
#[command(name = "hintkeys", version, about = "Assign keyboard shortcuts to a UI element tree")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a tree and print the assigned shortcuts
    Assign {
        /// YAML element tree
        #[arg(long)]
        tree: PathBuf,
    },
    /// Scan a tree, then press modifier+key and report what it activates
    Press {
        /// YAML element tree
        #[arg(long)]
        tree: PathBuf,

        /// Key to press together with the configured modifier
        #[arg(long)]
        key: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Assign { tree } => {
            let tree = load_tree(&tree)?;
            let mut engine = ShortcutEngine::new(config);
            let report = engine.scan_report(&tree, tree.root());

            for binding in &report.bindings {
                println!("{:<8} {}", binding.chord(), binding.label);
            }
            let unbound = report.unlabeled.len() + report.exhausted.len();
            if unbound > 0 {
                println!(
                    "{unbound} element(s) without shortcut ({} unlabeled, {} out of keys)",
                    report.unlabeled.len(),
                    report.exhausted.len()
                );
            }
        }
        Commands::Press { tree, key } => {
            let mut tree = load_tree(&tree)?;
            let modifier = config.modifier;
            let mut dispatcher = Dispatcher::new(modifier, config.pulse);
            let mut engine = ShortcutEngine::new(config);
            engine.scan(&tree, tree.root());

            let mut event = KeyEvent::down(&key).with_modifier(modifier);
            let handled =
                dispatcher.on_key_event(&mut event, engine.registry(), &mut tree, Instant::now());

            match tree.activations().last() {
                Some(element) if handled => {
                    let label = engine
                        .registry()
                        .lookup(*element)
                        .map(|b| b.label.as_str())
                        .unwrap_or_default();
                    println!("{modifier}+{key} activated {label:?}");
                }
                _ => {
                    println!("{modifier}+{key}: no binding");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn load_tree(path: &Path) -> Result<MemoryTree, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read tree {}: {e}", path.display()))?;
    Ok(MemoryTree::from_yaml(&source)?)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "hintkeys=info",
        1 => "hintkeys=debug",
        _ => "hintkeys=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
