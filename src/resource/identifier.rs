//! Type identifiers
//!
//! An asset type is addressed on the wire as `platform__kind__version`.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between coordinates in a compiled type identifier.
pub const DELIMITER: &str = "__";

/// Version used when a declaration does not pin one.
pub const DEFAULT_VERSION: &str = "latest";

/// The `(platform, kind, version)` triple identifying an asset type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub platform: String,
    pub kind: String,
    pub version: String,
}

impl Coordinates {
    pub fn new(platform: &str, kind: &str, version: &str) -> Self {
        Self {
            platform: platform.to_string(),
            kind: kind.to_string(),
            version: version.to_string(),
        }
    }

    /// Same platform and kind at a different version
    pub fn with_version(&self, version: &str) -> Self {
        Self::new(&self.platform, &self.kind, version)
    }

    pub fn type_identifier(&self) -> String {
        compile(&self.platform, &self.kind, &self.version)
    }

    /// Check every coordinate with [`validate`]
    pub fn validate(&self) -> Result<(), Error> {
        validate("platform", &self.platform)?;
        validate("kind", &self.kind)?;
        validate("version", &self.version)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_identifier())
    }
}

/// Reject a coordinate that [`parse`] could not recover from a compiled identifier.
///
/// A coordinate must be non-empty, must not contain [`DELIMITER`] and must not
/// start or end with `_`: `vpc_` compiles to `aws__vpc___latest`, which splits
/// as kind `vpc` and version `_latest`.
pub fn validate(field: &'static str, value: &str) -> Result<(), Error> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.contains(DELIMITER) {
        "must not contain `__`"
    } else if value.starts_with('_') || value.ends_with('_') {
        "must not start or end with `_`"
    } else {
        return Ok(());
    };
    Err(Error::InvalidCoordinate {
        field,
        value: value.to_string(),
        reason,
    })
}

/// Join coordinates into the wire-level type identifier.
///
/// Only coordinates accepted by [`validate`] parse back to themselves.
pub fn compile(platform: &str, kind: &str, version: &str) -> String {
    [platform, kind, version].join(DELIMITER)
}

/// Split a type identifier back into coordinates.
pub fn parse(type_identifier: &str) -> Option<Coordinates> {
    let mut parts = type_identifier.split(DELIMITER);
    let platform = parts.next().filter(|p| !p.is_empty())?;
    let kind = parts.next().filter(|k| !k.is_empty())?;
    let version = parts.next().filter(|v| !v.is_empty())?;
    if parts.next().is_some() {
        return None;
    }
    Some(Coordinates::new(platform, kind, version))
}

/// Whether `type_identifier` names the given platform and kind, at any version.
pub fn matches(type_identifier: &str, platform: &str, kind: &str) -> bool {
    parse(type_identifier)
        .map(|c| c.platform == platform && c.kind == kind)
        .unwrap_or(false)
}
