pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

#[cfg(feature = "lambda")]
pub use config::lambda::LambdaConfig;

pub use adapters::{LocalStorage, MemoryStore, RestStore};
pub use config::SyncConfig;
pub use core::sync::SyncEngine;
pub use utils::error::{Result, SyncError};
