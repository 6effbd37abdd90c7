//! # dataloom
//!
//! Client workflow for assembling and curating versioned machine-learning
//! datasets:
//!
//! - **Session Management**: one persisted access token, resolved to a user
//!   and gating every view
//! - **Dataset Assembly**: dataset → version → file uploads or source
//!   registration as a single sequential workflow
//! - **Curation**: asset registration, pipeline runs, and labeling against
//!   an existing version
//!
//! Storage, job execution, and identity live in external services; this
//! crate issues intents against them and re-reads the resulting state.

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod create;
pub mod infer;
pub mod label;
pub mod model;
pub mod session;
pub mod storage;
pub mod workspace;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use self::cli::Cli;

/// Main entry point for the application.
///
/// # Errors
///
/// Returns an error when the invoked command fails; each command reports
/// its own failure context.
pub async fn main(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    cli.run().await
}
