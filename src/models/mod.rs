//! Data models and structures for the accelerator latency bench

pub mod config;

// Re-export main model types
pub use config::Config;
