// Services module for configuration loading and identity access
pub mod auth;
pub mod identity_client;
pub mod openstack_config;
pub mod session;
