use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod commands;

use commands::{grant_author, init_database, serve, ServeOptions};

#[derive(Parser)]
#[command(name = "campusmart")]
#[command(about = "CampusMart marketplace web server and admin tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    ///
    /// Settings come from defaults, an optional campusmart.toml and
    /// CAMPUSMART__* environment variables; the flags below win over all of them.
    Serve {
        /// Database URL, e.g. sqlite://campusmart.db?mode=rwc
        #[arg(short, long, env = "DATABASE_URL")]
        database_url: Option<String>,

        /// Bind address for the web server
        ///
        /// Format: IP:PORT (e.g., 0.0.0.0:3000, 127.0.0.1:8080)
        #[arg(short, long, env = "BIND_ADDRESS")]
        bind_address: Option<String>,

        /// Apply pending migrations before accepting requests
        #[arg(long)]
        migrate: bool,
    },
    /// Initialize the database using migrations
    ///
    /// Creates every table and seeds the course list and blog settings.
    InitDb {
        /// Database URL
        ///
        /// For SQLite databases, use:
        ///   - sqlite:///absolute/path/to/database.sqlite?mode=rwc (absolute path)
        #[arg(short, long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Grant (or revoke) access to the blog author area
    GrantAuthor {
        /// Email of a registered user
        #[arg(short, long)]
        email: String,

        /// Revoke instead of grant
        #[arg(long)]
        revoke: bool,

        /// Database URL, defaults to the configured one
        #[arg(short, long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Serve {
                database_url,
                bind_address,
                migrate,
            } => {
                serve(ServeOptions {
                    database_url,
                    bind_address,
                    migrate,
                })
                .await?;
            }
            Commands::InitDb { database_url } => {
                init_database(&database_url).await?;
            }
            Commands::GrantAuthor {
                email,
                revoke,
                database_url,
            } => {
                grant_author(&email, !revoke, database_url).await?;
            }
        }
        Ok(())
    }
}
