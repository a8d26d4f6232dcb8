//! # superres-provision: The Supplier
//!
//! **Capability probing, readiness queries and model provisioning.**
//!
//! - [`CapabilityProbe`]: synchronous platform eligibility check.
//! - [`ReadinessOracle`]: asks a [`CapabilityProvider`] whether the model is
//!   usable, mapping any failure to `UnknownFailure`.
//! - [`ProvisionOrchestrator`]: installs the model and sets up the inference
//!   engine once the model is ready.
//! - [`LocalModelProvider`]: a provider backed by a cache directory and an
//!   HTTP download with byte-level progress.
//!
//! ## Usage
//!
//! ```no_run
//! use futures::channel::mpsc;
//! use futures::StreamExt;
//! use superres_core::protocol::AssetEvent;
//! use superres_provision::{CapabilityProvider, LocalModelProvider, ProvisionConfig};
//!
//! #[async_std::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProvisionConfig::load()?;
//!     let provider = LocalModelProvider::new(&config);
//!
//!     let (tx, mut rx) = mpsc::channel(16);
//!     let download = async_std::task::spawn(async move { provider.ensure_ready(tx).await });
//!     while let Some(event) = rx.next().await {
//!         if let AssetEvent::Progress(current, total) = event {
//!             print!("\r{}/{}", current, total);
//!         }
//!     }
//!     println!("\n{:?}", download.await?);
//!     Ok(())
//! }
//! ```

/// Downloading and caching the model file.
pub mod assets;

/// Directory, model and platform configuration.
pub mod config;

pub mod oracle;
pub mod orchestrator;
pub mod probe;
pub mod provider;

pub use assets::LocalModelProvider;
pub use config::{PlatformRequirement, ProvisionConfig};
pub use oracle::ReadinessOracle;
pub use orchestrator::ProvisionOrchestrator;
pub use probe::{CapabilityProbe, FixedProbe, SystemProbe};
pub use provider::CapabilityProvider;
