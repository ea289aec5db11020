//! Data access layer for the marketplace and the blog.
//!
//! Every operation is a free async function over a SeaORM connection, so the
//! same code runs against a pooled connection or inside a transaction. Values
//! supplied by callers are always bound as parameters by the query builder.
//! Operations spanning several statements open their own transaction.

pub mod articles;
pub mod comments;
pub mod courses;
pub mod error;
pub mod favourites;
pub mod images;
pub mod products;
pub mod reviews;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, StoreError};

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend};
use tracing::{debug, info, instrument};

/// Handle to the backing database, shared by every request handler.
#[derive(Clone, Debug)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    /// Connects to `database_url` and switches on foreign key enforcement for SQLite.
    #[instrument]
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to database");
        let db = Database::connect(database_url).await?;
        let store = Self::new(db);
        store.enable_foreign_keys().await?;
        Ok(store)
    }

    /// Wraps an existing connection.
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Image rows rely on `ON DELETE CASCADE`, which SQLite only honours with this pragma.
    pub async fn enable_foreign_keys(&self) -> Result<()> {
        if self.db.get_database_backend() == DbBackend::Sqlite {
            debug!("Enabling SQLite foreign keys");
            self.db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
        }
        Ok(())
    }

    /// Round-trips a trivial statement to the database.
    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}
