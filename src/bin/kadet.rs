use anyhow::{bail, Result};
use clap::Parser;
use kadet::cli::{compile_components, print_compile_summary, resolve_component, Commands, KadetCli};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = KadetCli::parse();

    // Initialize tracing
    let level = match cli.verbosity {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Starting kadet v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Compile(args) => {
            let reports = compile_components(&args).await?;
            print_compile_summary(&reports);

            let failed = reports.iter().filter(|r| !r.is_success()).count();
            if failed > 0 {
                bail!("{failed} component(s) failed to compile");
            }
        }
        Commands::Resolve { name, search_paths } => {
            let spec = resolve_component(&name, &search_paths)?;
            println!("{} -> {} ({})", name, spec.origin.display(), spec.name);
        }
    }

    Ok(())
}
