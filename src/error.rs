//! Error types
//!
//! `ApiError` classifies failures talking to the control-plane, `DecodeError`
//! reports a parameter bag that does not fit a kind's schema, and `Error` is
//! what every reconciler operation returns.

use std::time::Duration;
use thiserror::Error;

/// Failure calling the control-plane API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("could not reach control plane: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The control plane answered with a non-success status.
    #[error("control plane returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be read or parsed.
    #[error("invalid response body: {0}")]
    Body(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Failures worth retrying when polling: network errors, throttling,
    /// server errors and bodies we could not make sense of.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Body(_) => true,
            Self::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
        }
    }

    /// HTTP status, when the control plane answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// A required field was missing from a parameter bag or had the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode field `{field}`: {reason}")]
pub struct DecodeError {
    pub field: String,
    pub reason: String,
}

impl DecodeError {
    pub fn missing(field: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: "required field is missing".to_string(),
        }
    }

    pub fn wrong_type(field: &str, expected: &str, found: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: format!("expected {}, found {}", expected, found),
        }
    }
}

/// Errors surfaced by reconciler and connection operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("remote call failed: {0}")]
    Transport(#[from] ApiError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The asset reached the terminal FAILED status.
    #[error("provisioning failed for asset {asset_id}")]
    ProvisioningFailed { asset_id: String },

    #[error("timed out after {elapsed:?} waiting for asset {asset_id}")]
    WaitTimedOut { asset_id: String, elapsed: Duration },

    #[error("wait for asset {asset_id} was cancelled")]
    WaitCancelled { asset_id: String },

    /// Too many consecutive empty, malformed or transiently failing status reads.
    #[error("gave up on asset {asset_id} after {attempts} unusable status responses: {last}")]
    StatusUnavailable {
        asset_id: String,
        attempts: u32,
        last: String,
    },

    #[error("field `{field}` cannot be changed in place; destroy and recreate the asset")]
    ImmutableFieldChanged { field: String },

    #[error("asset {asset_id} does not exist")]
    AssetNotFound { asset_id: String },

    #[error("asset {asset_id} is a {found}, expected {expected}")]
    KindMismatch {
        asset_id: String,
        expected: String,
        found: String,
    },

    #[error("control plane returned no asset for {operation}")]
    EmptyResponse { operation: &'static str },

    #[error("invalid import id `{id}`: {reason}")]
    InvalidImportId { id: String, reason: String },

    #[error("unknown asset kind: {0}")]
    UnknownKind(String),

    /// A platform, kind or version that would not survive a compile/parse round trip.
    #[error("invalid {field} `{value}`: {reason}")]
    InvalidCoordinate {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("invalid kind definition `{key}`: {reason}")]
    InvalidKind { key: String, reason: String },

    #[error("malformed kind catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}

impl Error {
    /// True for the two outcomes where the asset exists remotely but did not
    /// settle: provisioning failed or we stopped waiting.
    pub fn is_wait_failure(&self) -> bool {
        matches!(
            self,
            Self::ProvisioningFailed { .. }
                | Self::WaitTimedOut { .. }
                | Self::WaitCancelled { .. }
                | Self::StatusUnavailable { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
