use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use store::Store;
use tracing::{debug, error, info, trace};

pub async fn init_database(database_url: &str) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");
    debug!("Database URL: {}", database_url);

    let store = match Store::connect(database_url).await {
        Ok(store) => {
            info!("Successfully connected to database");
            store
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    info!("Running database migrations");
    match Migrator::up(store.conn(), None).await {
        Ok(()) => {
            info!("Database migrations completed successfully");
            debug!("Courses and blog settings seeded");
        }
        Err(e) => {
            error!("Failed to run database migrations: {}", e);
            return Err(e.into());
        }
    }

    info!("Database initialization completed successfully!");
    Ok(())
}
