//! Blackbox CLI entry point.

use clap::Parser;

use blackbox::cli::{commands, handle_error, Cli, Commands};
use blackbox::infrastructure::config::ConfigLoader;
use blackbox::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, &config, cli.json).await,
        Commands::Levels(args) => commands::levels::execute(args, &config, cli.json).await,
        Commands::Play(args) => commands::play::execute(args, &config, cli.json).await,
        Commands::Progress(args) => commands::progress::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
