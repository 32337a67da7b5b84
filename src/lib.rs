//! assetsync - keep declared infrastructure assets in sync with a control plane
//!
//! Assets are created, updated and destroyed asynchronously by a remote
//! control plane. This crate compiles type identifiers, encodes declared
//! configuration into parameter bags, polls until each change settles, and
//! returns snapshots for the caller to persist.

pub mod cloud;
pub mod config;
pub mod error;
pub mod resource;

pub use cloud::{ControlPlane, HttpControlPlane};
pub use config::Config;
pub use error::{ApiError, DecodeError, Error, Result};
