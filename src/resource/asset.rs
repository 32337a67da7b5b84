//! Asset snapshots and declarations

use super::identifier::Coordinates;
use super::params::ParameterBag;
use crate::cloud::models::AssetStatus;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Locally persisted view of a managed asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset<C> {
    pub id: String,
    pub type_identifier: String,
    pub version: String,
    pub environment_id: String,
    pub organization_id: String,
    pub status: AssetStatus,
    pub config: C,
    /// Full parameter bag as last reported by the control plane
    #[serde(default)]
    pub parameters: ParameterBag,
    /// Outputs selected by the asset's kind
    #[serde(default)]
    pub outputs: ParameterBag,
}

impl<C> Asset<C> {
    pub fn locator(&self) -> AssetLocator {
        AssetLocator {
            organization_id: self.organization_id.clone(),
            environment_id: self.environment_id.clone(),
            asset_id: self.id.clone(),
        }
    }
}

/// Where an asset lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetLocator {
    pub organization_id: String,
    pub environment_id: String,
    pub asset_id: String,
}

impl AssetLocator {
    pub fn new(organization_id: &str, environment_id: &str, asset_id: &str) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            environment_id: environment_id.to_string(),
            asset_id: asset_id.to_string(),
        }
    }

    /// Parse an import id of the form `organization_id,environment_id,asset_id`.
    ///
    /// Each part must be a UUID.
    pub fn from_import_id(import_id: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidImportId {
            id: import_id.to_string(),
            reason,
        };

        let parts: Vec<&str> = import_id.split(',').map(str::trim).collect();
        let [organization_id, environment_id, asset_id] = parts.as_slice() else {
            return Err(invalid(format!(
                "expected organization_id,environment_id,asset_id but found {} part(s)",
                parts.len()
            )));
        };

        for (label, part) in [
            ("organization_id", organization_id),
            ("environment_id", environment_id),
            ("asset_id", asset_id),
        ] {
            uuid::Uuid::parse_str(part)
                .map_err(|e| invalid(format!("{} `{}` is not a UUID: {}", label, part, e)))?;
        }

        Ok(Self::new(organization_id, environment_id, asset_id))
    }
}

/// What the caller wants to exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Desired<C> {
    pub organization_id: String,
    pub environment_id: String,
    /// Version pin; the kind's default version when unset
    #[serde(default)]
    pub version: Option<String>,
    pub config: C,
    /// Ids of assets this one connects to at creation
    #[serde(default)]
    pub connects_to: Vec<String>,
}

impl<C> Desired<C> {
    pub fn new(organization_id: &str, environment_id: &str, config: C) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            environment_id: environment_id.to_string(),
            version: None,
            config,
            connects_to: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn connects_to(mut self, asset_id: &str) -> Self {
        self.connects_to.push(asset_id.to_string());
        self
    }

    /// Coordinates with the declared version applied.
    ///
    /// Fails with [`Error::InvalidCoordinate`] when the result would not
    /// round-trip through a type identifier, e.g. a version pinned to `""`.
    pub fn coordinates(&self, kind: &Coordinates) -> Result<Coordinates> {
        let coordinates = match &self.version {
            Some(version) => kind.with_version(version),
            None => kind.clone(),
        };
        coordinates.validate()?;
        Ok(coordinates)
    }
}

/// Sink for intermediate snapshots.
///
/// Called as soon as an asset id is known and again once it settles, so a
/// failed wait still leaves the caller with an id to clean up.
pub trait Checkpoint<C> {
    fn save(&mut self, asset: &Asset<C>);
}

impl<C, F: FnMut(&Asset<C>)> Checkpoint<C> for F {
    fn save(&mut self, asset: &Asset<C>) {
        self(asset)
    }
}
