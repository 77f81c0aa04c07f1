pub mod config;
pub mod core;
pub mod domain;
pub mod strategies;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use config::{cli::LocalStorage, toml_config::ExperimentConfig};
pub use core::{summarize, Chronicle, LabEngine, LinearPublicGoods, World};
pub use strategies::StrategyKind;
pub use utils::error::{LabError, Result};
