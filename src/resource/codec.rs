//! Parameter codec
//!
//! Converts declared configuration into the parameter bag the control plane
//! expects and back, and computes the bag sent on in-place updates.
//!
//! Decoding is deliberately asymmetric: required fields must be present and
//! well typed, optional fields that the server left out (or sent in a shape we
//! do not recognise) are simply left unset so accessors fall back to their
//! defaults.

use super::identifier::Coordinates;
use super::params::{ParamAccess, ParamValue, ParameterBag};
use super::registry::KindDef;
use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared configuration of an asset, keyed by field name.
///
/// A null value and an absent field mean the same thing, so nulls are never
/// stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, ParamValue>",
    into = "BTreeMap<String, ParamValue>"
)]
pub struct DeclaredConfig(BTreeMap<String, ParamValue>);

impl From<BTreeMap<String, ParamValue>> for DeclaredConfig {
    fn from(mut fields: BTreeMap<String, ParamValue>) -> Self {
        fields.retain(|_, value| !value.is_null());
        Self(fields)
    }
}

impl From<DeclaredConfig> for BTreeMap<String, ParamValue> {
    fn from(config: DeclaredConfig) -> Self {
        config.0
    }
}

impl DeclaredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, field: &str, value: impl Into<ParamValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Setting a field to null unsets it
    pub fn set(&mut self, field: &str, value: impl Into<ParamValue>) {
        match value.into() {
            ParamValue::Null => {
                self.0.remove(field);
            },
            value => {
                self.0.insert(field.to_string(), value);
            },
        }
    }

    pub fn unset(&mut self, field: &str) -> Option<ParamValue> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&ParamValue> {
        self.0.get(field)
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ParamAccess for DeclaredConfig {
    fn lookup(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }
}

/// Per-kind conversion between a declared configuration and parameter bags.
///
/// The reconciler is generic over this trait, so a kind is fully described by
/// its coordinates plus an encode/decode pair.
pub trait AssetKind: Send + Sync {
    type Config: Clone + Send + Sync;

    /// Platform, kind and default version
    fn coordinates(&self) -> Coordinates;

    fn encode(&self, config: &Self::Config) -> ParameterBag;

    fn decode(&self, bag: &ParameterBag) -> Result<Self::Config, DecodeError>;

    /// Parameter key holding the asset's human-readable name
    fn name_key(&self) -> &str {
        "name"
    }

    /// Outputs worth keeping in a snapshot, keyed by their local name
    fn select_outputs(&self, raw: &ParameterBag) -> ParameterBag {
        raw.clone()
    }
}

/// Walk the kind's fields and build the bag to transmit.
///
/// Absent fields are omitted, unless the field is nullable in which case an
/// explicit null is sent.
pub fn encode(kind: &KindDef, config: &DeclaredConfig) -> ParameterBag {
    let mut bag = ParameterBag::new();
    for field in &kind.fields {
        match config.get(&field.name) {
            Some(value) => bag.insert(field.wire_name(), value.clone()),
            None if field.nullable => bag.insert(field.wire_name(), ParamValue::Null),
            None => {},
        }
    }
    bag
}

/// Extract the kind's fields from a bag returned by the control plane.
pub fn decode(bag: &ParameterBag, kind: &KindDef) -> Result<DeclaredConfig, DecodeError> {
    let mut config = DeclaredConfig::new();

    for field in &kind.fields {
        let wire = field.wire_name();
        match bag.get(wire) {
            None | Some(ParamValue::Null) if field.required => {
                return Err(DecodeError::missing(&field.name));
            },
            None | Some(ParamValue::Null) => {},
            Some(value) if field.field_type.accepts(value) => {
                config.set(&field.name, value.clone());
            },
            Some(value) if field.required => {
                return Err(DecodeError::wrong_type(
                    &field.name,
                    field.field_type.name(),
                    value.type_name(),
                ));
            },
            Some(value) => {
                tracing::warn!(
                    "Skipping optional field {} on {}: expected {}, found {}",
                    field.name,
                    kind.kind,
                    field.field_type.name(),
                    value.type_name()
                );
            },
        }
    }

    Ok(config)
}

/// Bag to send on an in-place update.
///
/// Declared values win; keys only the remote side knows about (server-managed
/// extras) are carried over so the update does not erase them.
pub fn merge_for_update(declared: ParameterBag, remote: Option<&ParameterBag>) -> ParameterBag {
    let mut merged = declared;
    if let Some(remote) = remote {
        for (key, value) in remote.iter() {
            merged.insert_missing(key, value);
        }
    }
    merged
}

impl AssetKind for KindDef {
    type Config = DeclaredConfig;

    fn coordinates(&self) -> Coordinates {
        KindDef::coordinates(self)
    }

    fn encode(&self, config: &DeclaredConfig) -> ParameterBag {
        encode(self, config)
    }

    fn decode(&self, bag: &ParameterBag) -> Result<DeclaredConfig, DecodeError> {
        decode(bag, self)
    }

    fn name_key(&self) -> &str {
        self.field("name").map(|f| f.wire_name()).unwrap_or("name")
    }

    fn select_outputs(&self, raw: &ParameterBag) -> ParameterBag {
        self.outputs
            .iter()
            .filter_map(|output| {
                raw.get(output.source())
                    .map(|value| (output.name.clone(), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::KindRegistry;
    use serde_json::json;

    fn bag(value: serde_json::Value) -> ParameterBag {
        serde_json::from_value(value).unwrap()
    }

    fn ecs_compute() -> KindDef {
        KindRegistry::builtin()
            .get("aws_ecs_compute_service")
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_encode_uses_wire_names_and_omits_absent() {
        let registry = KindRegistry::builtin();
        let secret = registry.get("aws_secret").unwrap();
        let config = DeclaredConfig::new()
            .with("name", "db-password")
            .with("secret_string", "hunter2");

        let encoded = encode(secret, &config);
        assert_eq!(
            serde_json::to_value(&encoded).unwrap(),
            json!({"secret_name": "db-password", "secret_string": "hunter2", "kms_key_arn": null})
        );
    }

    #[test]
    fn test_nullable_field_round_trips_when_unset() {
        let registry = KindRegistry::builtin();
        let secret = registry.get("aws_secret").unwrap();
        let config = DeclaredConfig::new()
            .with("name", "db-password")
            .with("secret_string", "hunter2");

        let decoded = decode(&encode(secret, &config), secret).unwrap();
        assert_eq!(decoded, config);
        assert!(!decoded.is_set("kms_key_arn"));
    }

    #[test]
    fn test_null_is_the_same_as_unset() {
        let mut config = DeclaredConfig::new().with("name", "db").with("kms_key_arn", "arn:k");
        config.set("kms_key_arn", ParamValue::Null);
        assert!(!config.is_set("kms_key_arn"));
        assert_eq!(config, DeclaredConfig::new().with("name", "db"));

        let restored: DeclaredConfig =
            serde_json::from_value(json!({"name": "db", "kms_key_arn": null})).unwrap();
        assert_eq!(restored, config);
        assert_eq!(serde_json::to_value(&restored).unwrap(), json!({"name": "db"}));
    }

    #[test]
    fn test_encode_skips_undeclared_fields() {
        let registry = KindRegistry::builtin();
        let vpc = registry.get("aws_vpc").unwrap();
        let config = DeclaredConfig::new().with("name", "net-1").with("bogus", true);

        let encoded = encode(vpc, &config);
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded.string("name"), "net-1");
    }

    #[test]
    fn test_decode_missing_required_field_fails() {
        let kind = ecs_compute();
        let err = decode(&bag(json!({"name": "svc"})), &kind).unwrap_err();
        assert_eq!(err, DecodeError::missing("vpc_name"));
    }

    #[test]
    fn test_decode_wrong_type_on_required_field_fails() {
        let registry = KindRegistry::builtin();
        let vpc = registry.get("aws_vpc").unwrap();
        let err = decode(&bag(json!({"name": ["net-1"]})), vpc).unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.reason, "expected string, found list");
    }

    #[test]
    fn test_decode_is_lenient_on_optional_fields() {
        let kind = ecs_compute();
        let decoded = decode(
            &bag(json!({
                "vpc_name": "net-1",
                "name": "svc",
                "container_name": "web",
                "container_image": "nginx:1.25",
                "container_port": 80,
                "container_command": ["nginx", "-g", "daemon off;"],
                "environment_secrets": [],
                "is_ecr_image": "not-a-bool",
                "internal_routing": {"shard": 3}
            })),
            &kind,
        )
        .unwrap();

        assert!(!decoded.is_set("is_ecr_image"));
        assert!(!decoded.bool("is_ecr_image"));
        assert!(!decoded.is_set("wait_for_steady_state"));
        assert_eq!(decoded.string("container_registry_secret_arn"), "");
        assert_eq!(decoded.integer("container_port"), 80);
        assert!(!decoded.is_set("internal_routing"));
    }

    #[test]
    fn test_decode_keeps_server_defaulted_values() {
        let kind = ecs_compute();
        let decoded = decode(
            &bag(json!({
                "vpc_name": "net-1",
                "name": "svc",
                "container_name": "web",
                "container_image": "nginx",
                "container_port": 8080.0,
                "container_command": [],
                "environment_secrets": [
                    {"environment_variable": "DB_URL", "secret_arn": "arn:aws:secret", "secret_json_key": "url"}
                ],
                "wait_for_steady_state": false
            })),
            &kind,
        )
        .unwrap();

        assert!(decoded.is_set("wait_for_steady_state"));
        assert_eq!(decoded.integer("container_port"), 8080);
        assert_eq!(
            decoded.get("environment_secrets").and_then(ParamValue::as_list).map(<[_]>::len),
            Some(1)
        );
    }

    #[test]
    fn test_merge_prefers_declared_and_keeps_remote_extras() {
        let declared = bag(json!({"name": "net-2"}));
        let remote = bag(json!({"name": "net-1", "internal_tag": "x"}));

        let merged = merge_for_update(declared, Some(&remote));
        assert_eq!(
            serde_json::to_value(&merged).unwrap(),
            json!({"name": "net-2", "internal_tag": "x"})
        );
    }

    #[test]
    fn test_merge_without_remote_is_plain_encode() {
        let declared = bag(json!({"name": "net-2"}));
        assert_eq!(merge_for_update(declared.clone(), None), declared);
    }

    #[test]
    fn test_select_outputs_renames_sources() {
        let registry = KindRegistry::builtin();
        let redis = registry.get("aws_elasticache_redis").unwrap();
        let raw = bag(json!({
            "elasticache_token_secret_arn": "arn:secret",
            "elasticache_arn": "arn:cache",
            "elasticache_primary_endpoint_address": "redis.internal"
        }));

        let outputs = redis.select_outputs(&raw);
        assert_eq!(outputs.string("uri_secret_arn"), "arn:secret");
        assert_eq!(outputs.string("elasticache_arn"), "arn:cache");
        assert_eq!(outputs.string("elasticache_cluster_id"), "");
        assert!(!outputs.contains_key("elasticache_primary_endpoint_address"));
    }

    #[test]
    fn test_name_key_follows_wire_name() {
        let registry = KindRegistry::builtin();
        assert_eq!(registry.get("aws_secret").unwrap().name_key(), "secret_name");
        assert_eq!(registry.get("aws_vpc").unwrap().name_key(), "name");
        assert_eq!(
            registry.get("aws_acm_certificate_waiter").unwrap().name_key(),
            "name"
        );
    }
}
