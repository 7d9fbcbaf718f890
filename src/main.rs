use std::path::Path;

use clap::Parser;
use tracker::cli::commands::{Cli, Commands};
use tracker::cli::handlers;
use tracker::logging;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => {
            // Init is handled before store discovery
            logging::init_logging(logging::DEFAULT_LEVEL);
            handlers::cmd_init(args, cli.tracker_dir.as_deref().map(Path::new))
        }
        _ => handlers::dispatch(cli),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
