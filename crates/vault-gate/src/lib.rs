//! Integrity gate for the vault's reference asset.
//!
//! One large, immutable asset must be stored and intact before the rest of
//! the application may start. [`AssetGate::ensure`] checks the stored copy
//! against a small set of [`KnownSizes`], fetches a fresh copy from an
//! [`AssetSource`] when needed, and commits it through the file system.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vault_fs::{open_file_system, DirectoryExport, FsConfig};
//! use vault_gate::{AssetGate, GateConfig, NoProgress};
//! use vault_store::StoreConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fs = open_file_system(
//!     &StoreConfig::default(),
//!     FsConfig::default(),
//!     Arc::new(DirectoryExport::new("exports")),
//! )
//! .await;
//! let mut gate = AssetGate::from_config(&GateConfig::default())?;
//! let asset = gate.ensure(fs.as_ref(), &NoProgress).await?;
//! println!("asset ready: {} bytes", asset.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod progress;
pub mod sizes;
pub mod source;

pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use gate::{AssetGate, AssetState};
pub use progress::{NoProgress, Progress, ProgressSink};
pub use sizes::KnownSizes;
pub use source::{AssetSource, HttpSource};
