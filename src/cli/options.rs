use crate::types::CompileConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Main kadet CLI interface
#[derive(Parser)]
#[command(name = "kadet")]
#[command(about = "Compile Rhai components against inventory into YAML, JSON or plain files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct KadetCli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile components into an output directory
    Compile(CompileArgs),

    /// Show which file a component name resolves to
    Resolve {
        /// Component name or path
        name: String,
        /// Search roots, tried in order
        #[arg(short = 'J', long = "search-path", default_value = ".")]
        search_paths: Vec<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Component files or names to compile
    #[arg(required = true)]
    pub components: Vec<PathBuf>,

    /// Search roots for components, imports and inventory, tried in order
    #[arg(short = 'J', long = "search-path", default_value = ".")]
    pub search_paths: Vec<PathBuf>,

    /// Directory the output files are written to
    #[arg(short, long = "output-path", default_value = "compiled")]
    pub output_path: PathBuf,

    /// Target whose inventory the components see
    #[arg(short, long)]
    pub target: Option<String>,

    /// Inventory directory (contains targets/)
    #[arg(long)]
    pub inventory_path: Option<PathBuf>,

    /// Output format: yaml, yml, json or plain
    #[arg(long, default_value = "yaml")]
    pub output: String,

    /// Remove nulls and empty containers from the output
    #[arg(long)]
    pub prune: bool,

    /// Reveal secret references in the output
    #[arg(long)]
    pub reveal: bool,

    /// JSON indentation
    #[arg(long, default_value = "2")]
    pub indent: usize,

    /// YAML or JSON file with a mapping of input parameters
    #[arg(long)]
    pub input_params: Option<PathBuf>,
}

impl From<&CompileArgs> for CompileConfig {
    fn from(args: &CompileArgs) -> Self {
        Self {
            output: args.output.clone(),
            prune: args.prune,
            reveal: args.reveal,
            target_name: args.target.clone(),
            inventory_path: args.inventory_path.clone(),
            indent: args.indent,
        }
    }
}
