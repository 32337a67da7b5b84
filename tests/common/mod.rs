//! Shared fixtures: a scripted in-memory control plane and response builders

#![allow(dead_code)]

use assetsync::cloud::models::{
    AssetInput, AssetOutput, AssetStatus, ConnectionInput, ConnectionOutput,
};
use assetsync::{ApiError, ControlPlane};
use futures::future::{BoxFuture, FutureExt};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const ORG: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";
pub const ENV: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";
pub const ASSET: &str = "e4eaaaf2-d142-11e1-b3e4-080027620cdd";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Asset description in environment [`ENV`] of organization [`ORG`]
pub fn output(
    id: &str,
    type_identifier: &str,
    status: AssetStatus,
    parameters: serde_json::Value,
) -> AssetOutput {
    serde_json::from_value(json!({
        "id": id,
        "asset": type_identifier,
        "asset_version": type_identifier.rsplit("__").next().unwrap_or("latest"),
        "environment": {"id": ENV, "organization": {"id": ORG}},
        "status": status,
        "current_asset_parameters": {"data": parameters}
    }))
    .unwrap()
}

pub fn vpc(id: &str, status: AssetStatus, name: &str) -> AssetOutput {
    output(id, "aws__vpc__latest", status, json!({ "name": name }))
}

pub fn not_found() -> ApiError {
    ApiError::status(404, "not found")
}

pub fn connection(id: &str, incoming: &str, outgoing: &str) -> ConnectionOutput {
    serde_json::from_value(json!({
        "id": id,
        "incoming_connection_asset": {"id": incoming, "environment": {"id": ENV, "organization": {"id": ORG}}},
        "outgoing_connection_asset": {"id": outgoing}
    }))
    .unwrap()
}

/// Control plane replaying scripted replies in order and recording every call
#[derive(Default)]
pub struct FakeControlPlane {
    pub create_replies: Mutex<VecDeque<Result<AssetOutput, ApiError>>>,
    pub update_replies: Mutex<VecDeque<Result<AssetOutput, ApiError>>>,
    pub describe_replies: Mutex<VecDeque<Result<Option<AssetOutput>, ApiError>>>,
    /// Answer for describes once the script runs out
    pub describe_fallback: Mutex<Option<AssetOutput>>,
    pub destroy_replies: Mutex<VecDeque<Result<(), ApiError>>>,
    pub listed: Mutex<Vec<AssetOutput>>,
    pub connection_replies: Mutex<VecDeque<Result<Option<ConnectionOutput>, ApiError>>>,
    pub connection_destroy_replies: Mutex<VecDeque<Result<(), ApiError>>>,

    /// Bodies of create and update calls
    pub submitted: Mutex<Vec<AssetInput>>,
    pub connection_inputs: Mutex<Vec<ConnectionInput>>,
    /// Operation names in call order
    pub calls: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(self, reply: Result<AssetOutput, ApiError>) -> Self {
        self.create_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_update(self, reply: Result<AssetOutput, ApiError>) -> Self {
        self.update_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_describe(self, reply: Result<Option<AssetOutput>, ApiError>) -> Self {
        self.describe_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_describe_status(self, output: AssetOutput) -> Self {
        self.on_describe(Ok(Some(output)))
    }

    pub fn describe_forever(self, output: AssetOutput) -> Self {
        *self.describe_fallback.lock().unwrap() = Some(output);
        self
    }

    pub fn on_destroy(self, reply: Result<(), ApiError>) -> Self {
        self.destroy_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_listed(self, assets: Vec<AssetOutput>) -> Self {
        *self.listed.lock().unwrap() = assets;
        self
    }

    pub fn on_connection(self, reply: Result<Option<ConnectionOutput>, ApiError>) -> Self {
        self.connection_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_connection_destroy(self, reply: Result<(), ApiError>) -> Self {
        self.connection_destroy_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn describe_count(&self) -> usize {
        self.count("describe_asset")
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<AssetInput> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, operation: &str) {
        self.calls.lock().unwrap().push(operation.to_string());
    }
}

fn next<T>(queue: &Mutex<VecDeque<T>>, operation: &str) -> T {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| panic!("unexpected {} call", operation))
}

impl ControlPlane for FakeControlPlane {
    fn create_asset<'a>(
        &'a self,
        _organization_id: &'a str,
        _environment_id: &'a str,
        input: &'a AssetInput,
    ) -> BoxFuture<'a, Result<AssetOutput, ApiError>> {
        async move {
            self.record("create_asset");
            self.submitted.lock().unwrap().push(input.clone());
            next(&self.create_replies, "create_asset")
        }
        .boxed()
    }

    fn describe_asset<'a>(
        &'a self,
        _organization_id: &'a str,
        _environment_id: &'a str,
        _asset_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<AssetOutput>, ApiError>> {
        async move {
            self.record("describe_asset");
            let scripted = self.describe_replies.lock().unwrap().pop_front();
            match scripted {
                Some(reply) => reply,
                None => match self.describe_fallback.lock().unwrap().clone() {
                    Some(output) => Ok(Some(output)),
                    None => panic!("unexpected describe_asset call"),
                },
            }
        }
        .boxed()
    }

    fn update_asset<'a>(
        &'a self,
        _asset_id: &'a str,
        _environment_id: &'a str,
        _organization_id: &'a str,
        input: &'a AssetInput,
    ) -> BoxFuture<'a, Result<AssetOutput, ApiError>> {
        async move {
            self.record("update_asset");
            self.submitted.lock().unwrap().push(input.clone());
            next(&self.update_replies, "update_asset")
        }
        .boxed()
    }

    fn destroy_asset<'a>(
        &'a self,
        _organization_id: &'a str,
        _environment_id: &'a str,
        _asset_id: &'a str,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        async move {
            self.record("destroy_asset");
            next(&self.destroy_replies, "destroy_asset")
        }
        .boxed()
    }

    fn list_assets<'a>(
        &'a self,
        _organization_id: &'a str,
        _environment_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<AssetOutput>, ApiError>> {
        async move {
            self.record("list_assets");
            Ok(self.listed.lock().unwrap().clone())
        }
        .boxed()
    }

    fn create_connection<'a>(
        &'a self,
        _organization_id: &'a str,
        _environment_id: &'a str,
        incoming_asset_id: &'a str,
        input: &'a ConnectionInput,
    ) -> BoxFuture<'a, Result<ConnectionOutput, ApiError>> {
        async move {
            self.record("create_connection");
            self.connection_inputs.lock().unwrap().push(input.clone());
            Ok(connection(
                &format!("c{}", self.count("create_connection")),
                incoming_asset_id,
                &input.outgoing_connection_asset_id,
            ))
        }
        .boxed()
    }

    fn get_connection<'a>(
        &'a self,
        _organization_id: &'a str,
        _environment_id: &'a str,
        _incoming_asset_id: &'a str,
        _connection_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ConnectionOutput>, ApiError>> {
        async move {
            self.record("get_connection");
            next(&self.connection_replies, "get_connection")
        }
        .boxed()
    }

    fn destroy_connection<'a>(
        &'a self,
        _organization_id: &'a str,
        _environment_id: &'a str,
        _incoming_asset_id: &'a str,
        _connection_id: &'a str,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        async move {
            self.record("destroy_connection");
            next(&self.connection_destroy_replies, "destroy_connection")
        }
        .boxed()
    }
}
