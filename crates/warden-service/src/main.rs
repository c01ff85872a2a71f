use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use warden_service::cli::{Cli, Command};
use warden_service::commands;
use warden_service::config::{AppConfig, LogFormat};
use warden_service::metrics::Metrics;
use warden_storage::PostgresStore;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output on stdout stays machine-readable.
    match config.log.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr);
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr);
            registry.with(fmt_layer).init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    let metrics = Arc::new(Metrics::new());
    let success = match cli.command {
        Command::Check {
            fixture,
            actor,
            scope,
            action,
            subject,
            instance,
        } => {
            let outcome = commands::check(
                &config,
                &metrics,
                &fixture,
                &actor,
                &scope,
                &action,
                &subject,
                instance.as_deref(),
            )
            .await?;
            println!("{}", commands::render(&outcome));
            outcome.allowed
        }
        Command::Boundary {
            fixture,
            scope,
            requestor,
            target,
        } => {
            let result =
                commands::boundary(&config, &metrics, &fixture, &scope, &requestor, &target)
                    .await?;
            println!("{}", commands::render(&result));
            result.is_valid
        }
        Command::Roles { scope_kind } => {
            println!("{}", commands::render(&commands::roles(scope_kind)));
            true
        }
        Command::Migrate => {
            run_migrate(&config).await?;
            true
        }
    };

    if cli.metrics {
        eprint!("{}", metrics.render_prometheus());
    }
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_migrate(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("running database migrations");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    PostgresStore::new(pool).migrate().await?;
    tracing::info!("migrations completed successfully");
    Ok(())
}
