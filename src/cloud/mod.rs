//! Control-plane API interaction module
//!
//! # Module Structure
//!
//! - [`client`] - The [`ControlPlane`] trait and its REST implementation
//! - [`http`] - HTTP utilities for REST API calls
//! - [`models`] - Request and response bodies
//!
//! # Example
//!
//! ```ignore
//! use assetsync::cloud::{ControlPlane, HttpControlPlane};
//!
//! async fn example(base: url::Url, token: &str) -> anyhow::Result<()> {
//!     let client = HttpControlPlane::new(base, token)?;
//!     let assets = client.list_assets("org-id", "env-id").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod models;

pub use client::{ControlPlane, HttpControlPlane};
pub use models::{AssetInput, AssetOutput, AssetStatus, ConnectionInput, ConnectionOutput};
