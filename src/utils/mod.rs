// Shared utilities: errors, config locations, logging
pub mod config;
pub mod error;
pub mod logging;
