use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ck_cli::cli::{Cli, Command, ConfigCommand};
use ck_domain::config::ObservabilityConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // API keys usually live in a local .env file; a missing file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let (config, config_path) = ck_cli::cli::load_config()?;

    match cli.command {
        // Default to an interactive chat when no subcommand is given.
        None => {
            init_tracing(&config.observability);
            ck_cli::cli::chat::chat(Arc::new(config), false, None).await
        }
        Some(Command::Chat { new, session }) => {
            init_tracing(&config.observability);
            ck_cli::cli::chat::chat(Arc::new(config), new, session).await
        }
        Some(Command::Run { message, session, json }) => {
            init_tracing(&config.observability);
            ck_cli::cli::run::run(Arc::new(config), message, session, json).await
        }
        Some(Command::Sessions { json }) => {
            init_tracing(&config.observability);
            ck_cli::cli::sessions::list(&config, json)
        }
        Some(Command::Show { id, json }) => {
            init_tracing(&config.observability);
            ck_cli::cli::sessions::show(&config, id, json)
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let valid = ck_cli::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => ck_cli::cli::config::show(&config),
        Some(Command::Version) => {
            println!("chatkeep {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize stderr logging.  `RUST_LOG` wins over the configured filter.
fn init_tracing(obs: &ObservabilityConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&obs.log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    if obs.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
