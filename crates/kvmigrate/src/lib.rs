// ai
//! 🚚 kvmigrate: moves documents out of one search cluster (or dump file) and into
//! another cluster (or dump file), whatever version each side happens to be running.
//!
//! The public surface is deliberately small: build an [`app_config::AppConfig`]
//! (usually via [`app_config::load_config`]), hand it to [`run`], read the
//! [`MigrationSummary`] that comes back. Everything else is the supervisor's business. 🦆

pub mod app_config;

mod adapters;
mod channel;
mod common;
mod progress;
mod supervisors;
mod transforms;
mod transport;
mod workers;

use anyhow::Result;

use crate::app_config::AppConfig;
use crate::supervisors::Supervisor;

pub use crate::progress::MigrationSummary;

/// 🚀 Run one migration from start to finish.
pub async fn run(app_config: AppConfig) -> Result<MigrationSummary> {
    Supervisor::new(app_config).run().await
}
