//! Wire models for the control-plane API

use crate::resource::params::{ParamValue, ParameterBag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server-owned lifecycle status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    /// Accepted, provisioning not finished
    Pending,
    /// Terminal success of create/update
    Deployed,
    /// Terminal failure
    Failed,
    /// Terminal success of delete
    Destroyed,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl AssetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetStatus::Pending => "PENDING",
            AssetStatus::Deployed => "DEPLOYED",
            AssetStatus::Failed => "FAILED",
            AssetStatus::Destroyed => "DESTROYED",
            AssetStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of create and update requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInput {
    /// Compiled type identifier (`platform__kind__version`)
    pub asset: String,
    pub asset_version: String,
    pub asset_parameters: ParameterBag,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connects_to: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRef {
    pub id: String,
    #[serde(default)]
    pub organization: OrganizationRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentParameters {
    #[serde(default)]
    pub data: ParameterBag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    #[serde(default)]
    pub data: Option<ParamValue>,
}

/// Asset as described by the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetOutput {
    pub id: String,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub asset_version: String,
    #[serde(default)]
    pub environment: EnvironmentRef,
    pub status: AssetStatus,
    #[serde(default)]
    pub current_asset_parameters: Option<CurrentParameters>,
    #[serde(default)]
    pub outputs: Option<BTreeMap<String, OutputValue>>,
}

impl AssetOutput {
    /// Current full parameter bag (empty when the server sent none)
    pub fn parameters(&self) -> ParameterBag {
        self.current_asset_parameters
            .as_ref()
            .map(|p| p.data.clone())
            .unwrap_or_default()
    }

    /// Output values flattened to `key -> data`, skipping null data
    pub fn output_values(&self) -> ParameterBag {
        self.outputs
            .iter()
            .flatten()
            .filter_map(|(key, output)| output.data.clone().map(|data| (key.clone(), data)))
            .collect()
    }
}

/// Body of a connection create request; the incoming asset is in the URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInput {
    pub outgoing_connection_asset_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub id: String,
    #[serde(default)]
    pub environment: EnvironmentRef,
}

/// Connection as described by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOutput {
    pub id: String,
    pub incoming_connection_asset: AssetRef,
    pub outgoing_connection_asset: AssetRef,
}
