mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Tags go to stdout, so logs must stay on stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regex_tagger=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Scan {
            paths,
            parser,
            jobs,
        } => {
            cli::scan_paths(config, &paths, parser.as_deref(), jobs)?;
        }
        Commands::Parsers => {
            cli::list_parsers(config)?;
        }
        Commands::Kinds { parser } => {
            cli::list_kinds(config, &parser)?;
        }
    }

    Ok(())
}
