// Models module for data structures
pub mod catalog;
pub mod cloud_config;
pub mod manifest;
pub mod requirement;
pub mod version;
