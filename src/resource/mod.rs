//! Asset abstraction layer
//!
//! This module provides a data-driven approach to managing control-plane
//! assets. Kind definitions are loaded from JSON files at compile time, and a
//! single generic [`Reconciler`] drives every kind through its lifecycle.
//!
//! # Architecture
//!
//! - [`identifier`] - Compiles and parses `platform__kind__version` type identifiers
//! - [`params`] - Parameter values, bags and safe accessors
//! - [`registry`] - Loads kind definitions from embedded JSON
//! - [`codec`] - Encodes declared config to parameter bags and back, plus the update merge
//! - [`waiter`] - Bounded status polling
//! - [`reconciler`] - Create, read, update, delete, lookup and import
//! - [`connection`] - Connections between assets
//!
//! # Kind Definitions
//!
//! Kinds are defined in JSON files under `src/resources/`:
//! - `aws.json` - VPC, Redis, ECS, ACM, secrets and RDS
//! - `null.json` - A parameter-only kind for tests and dry runs
//!
//! # Example
//!
//! ```ignore
//! use assetsync::resource::{DeclaredConfig, Desired, KindRegistry, Reconciler, WaitPolicy};
//!
//! async fn create_vpc(client: &assetsync::cloud::HttpControlPlane) -> assetsync::Result<()> {
//!     let registry = KindRegistry::builtin();
//!     let vpc = registry.lookup("aws_vpc")?;
//!     let reconciler = Reconciler::new(client, vpc, WaitPolicy::default());
//!     let desired = Desired::new("org-id", "env-id", DeclaredConfig::new().with("name", "net-1"));
//!     let asset = reconciler.create(&desired, &mut |snapshot: &_| persist(snapshot)).await?;
//!     Ok(())
//! }
//! ```

pub mod asset;
pub mod codec;
pub mod connection;
pub mod identifier;
pub mod params;
pub mod reconciler;
pub mod registry;
pub mod waiter;

pub use asset::{Asset, AssetLocator, Checkpoint, Desired};
pub use codec::{merge_for_update, AssetKind, DeclaredConfig};
pub use connection::{Connection, ConnectionLocator, ConnectionManager};
pub use identifier::Coordinates;
pub use params::{ParamAccess, ParamValue, ParameterBag};
pub use reconciler::Reconciler;
pub use registry::{FieldDef, FieldType, KindDef, KindRegistry, OutputDef};
pub use waiter::{WaitMachine, WaitPolicy, WaitTarget, Waiter};

/// `value`, or `fallback` when the control plane left it empty
pub(crate) fn non_empty(value: &str, fallback: &str) -> String {
    let chosen = if value.is_empty() { fallback } else { value };
    chosen.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_prefers_value() {
        assert_eq!(non_empty("env-2", "env-1"), "env-2");
        assert_eq!(non_empty("", "env-1"), "env-1");
    }
}
