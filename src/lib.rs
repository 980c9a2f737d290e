pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::LocalStorage;
pub use config::TomlConfig;
pub use core::{audio::AudioService, flow::FlowPlan, flow::FlowRunner};
pub use utils::error::{AudioError, Result};
