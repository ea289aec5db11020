pub mod entities;
pub mod rating;

// Re-export tracing for use in this crate
pub use tracing;
