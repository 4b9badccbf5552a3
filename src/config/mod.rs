//! Configuration module.
//!
//! This module provides functionality for loading server and hostname
//! lists, validating user input, and the tunable run settings.

pub mod defaults;
pub mod lists;
pub mod loader;
pub mod settings;
pub mod validation;

pub use lists::{HostnameList, ServerList};
pub use loader::ConfigLoader;
pub use settings::TestSettings;
pub use validation::{sanitize, sanitize_server, validate_hostname, validate_server_url};
