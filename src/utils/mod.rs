pub mod config;
pub mod credentials;
pub mod logger;
pub mod settings;
pub mod settings_toml;

pub use config::*;
pub use credentials::resolve_passwords;
pub use logger::{rule, setup_logging};
pub use settings::Settings;
