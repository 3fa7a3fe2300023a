//! Splice CLI — assemble, write, run and watch.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "splice",
    version,
    about = "Assemble one source file from fragments — section includes, define-driven conditionals, manifest build settings"
)]
struct Cli {
    #[command(flatten)]
    args: splice::cli::BuildArgs,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if let Err(e) = splice::cli::dispatch(cli.args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
