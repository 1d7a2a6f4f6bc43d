//! Festa CLI - contest announcements in, scored photos out.

use clap::Parser;
use festa_cli::commands;
use festa_cli::{Cli, Command, Config, Formatter, Session};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> festa_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load config, falling back to defaults when the file is absent
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::path()?,
    };
    let mut config = Config::load_from(&config_path)?;

    // Command-line values win over the file
    if cli.api_key.is_some() {
        config.gemini.api_key = cli.api_key.clone();
    }
    if let Some(database) = &cli.database {
        config.settings.database = Some(database.clone());
    }

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    // Commands that never touch the database
    let command = match cli.command {
        Command::Config(args) => {
            return commands::execute_config(args, &config, &config_path, &formatter);
        }
        command => command,
    };

    let database = config.database_path()?;
    let session = Session::open(config, &database, cli.offline)?;

    match command {
        Command::Extract(args) => commands::execute_extract(args, &session, &formatter).await,
        Command::Context(args) => commands::execute_context(args, &session, &formatter).await,
        Command::Analyze(args) => commands::execute_analyze(args, &session, &formatter).await,
        Command::RemovePhoto(args) => commands::execute_remove_photo(args, &session, &formatter),
        Command::List(args) => commands::execute_list(args, &session, &formatter),
        Command::Show(args) => commands::execute_show(args, &session, &formatter),
        Command::Delete(args) => commands::execute_delete(args, &session, &formatter).await,
        Command::Export(args) => commands::execute_export(args, &session, &formatter),
        Command::Import(args) => commands::execute_import(args, &session, &formatter).await,
        Command::Config(_) => unreachable!("handled before the session opens"),
    }
}
