pub mod grant_author;
pub mod initdb;
pub mod serve;

pub use grant_author::grant_author;
pub use initdb::init_database;
pub use serve::{serve, ServeOptions};
