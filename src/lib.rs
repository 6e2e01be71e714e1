pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands, UserCommands};
pub use config::Config;
use db::Store;

pub async fn run() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config);

    let Some(command) = args.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Bootstrap { strict } => cli::cmd_bootstrap(&config, strict).await,

        Commands::Init {
            skip_sample_data,
            strict,
        } => cli::cmd_init(&config, skip_sample_data, strict).await,

        Commands::CreateSuperuser {
            username,
            email,
            password,
        } => cli::cmd_create_superuser(&config, username, email, password).await,

        Commands::Users { command } => match command {
            UserCommands::Create {
                username,
                role,
                email,
                password,
                company_id,
                experience_years,
            } => {
                cli::cmd_users_create(
                    &config,
                    username,
                    role,
                    email,
                    password,
                    company_id,
                    experience_years,
                )
                .await
            }
            UserCommands::List => cli::cmd_users_list(&config).await,
        },

        Commands::Serve => run_server(config, prometheus_handle).await,

        Commands::Config { command } => match command {
            ConfigCommands::Init => cli::cmd_config_init(),
            ConfigCommands::Show => cli::cmd_config_show(&config),
        },
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("ValidS v{} starting...", env!("CARGO_PKG_VERSION"));

    let store = match Store::connect(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            warn!("Account store not reachable at startup: {}", e);
            Store::open(&config.database)
                .await
                .context("Failed to open account store")?
        }
    };
    info!("Using {} account store", store.backend_name());

    if config.bootstrap.on_startup {
        if let Some(outcome) =
            services::bootstrap_on_startup(&store, &config.bootstrap, &config.security).await
        {
            cli::print_outcome(&outcome);
        }
    }

    if !config.server.enabled {
        info!("HTTP server disabled, exiting after bootstrap");
        store.close().await;
        return Ok(());
    }

    let port = config.server.port;
    let state = api::create_app_state(store.clone(), config, prometheus_handle);
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🌐 Web Server running at http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.close().await;
    info!("Server stopped");

    served.context("Web server error")
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
