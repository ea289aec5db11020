use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace};

use crate::config::{initialize_app_state, Settings};
use crate::router::create_router;

/// Command-line overrides on top of the loaded settings.
#[derive(Debug, Default)]
pub struct ServeOptions {
    pub database_url: Option<String>,
    pub bind_address: Option<String>,
    pub migrate: bool,
}

pub async fn serve(options: ServeOptions) -> Result<()> {
    trace!("Entering serve function");
    info!("CampusMart starting up");

    let mut settings = Settings::load()?;
    if let Some(database_url) = options.database_url {
        settings.database_url = database_url;
    }
    if let Some(bind_address) = options.bind_address {
        settings.bind_address = bind_address;
    }
    let bind_address = settings.bind_address.clone();
    debug!("Database URL: {}", settings.database_url);
    debug!("Bind address: {}", bind_address);

    // Initialize application state
    trace!("Initializing application state");
    let state = match initialize_app_state(settings).await {
        Ok(state) => {
            debug!("Application state initialized successfully");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    if options.migrate {
        info!("Running database migrations");
        if let Err(e) = Migrator::up(state.store.conn(), None).await {
            error!("Failed to run database migrations: {}", e);
            return Err(e.into());
        }
        debug!("All pending migrations have been applied");
    }

    trace!("Creating application router");
    let app = create_router(state);

    trace!("Attempting to bind TCP listener to {}", bind_address);
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            return Err(e.into());
        }
    };

    info!("CampusMart running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
