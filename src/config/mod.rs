// src/config/mod.rs

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_or_init, parse_config};
pub use model::{
    ConfigFile, GithubSection, ProcessSection, RawConfigFile, SelfUpdateSection, ShimSection,
    UpdateSection, WebhookCredentials, WebhookSection,
};
