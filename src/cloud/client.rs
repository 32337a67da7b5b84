//! Control-plane client
//!
//! [`ControlPlane`] is the seam the reconciler and connection manager talk
//! through. [`HttpControlPlane`] implements it over the REST API; tests swap in
//! scripted fakes.

use super::http::ApiHttpClient;
use super::models::{AssetInput, AssetOutput, ConnectionInput, ConnectionOutput};
use crate::config::Config;
use crate::error::ApiError;
use futures::future::{BoxFuture, FutureExt};
use url::Url;

/// Remote operations on assets and connections.
///
/// `describe_asset` and `get_connection` return `Ok(None)` when the server
/// answered successfully but with no body.
pub trait ControlPlane: Send + Sync {
    fn create_asset<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        input: &'a AssetInput,
    ) -> BoxFuture<'a, Result<AssetOutput, ApiError>>;

    fn describe_asset<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        asset_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<AssetOutput>, ApiError>>;

    fn update_asset<'a>(
        &'a self,
        asset_id: &'a str,
        environment_id: &'a str,
        organization_id: &'a str,
        input: &'a AssetInput,
    ) -> BoxFuture<'a, Result<AssetOutput, ApiError>>;

    fn destroy_asset<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        asset_id: &'a str,
    ) -> BoxFuture<'a, Result<(), ApiError>>;

    fn list_assets<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<AssetOutput>, ApiError>>;

    fn create_connection<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        incoming_asset_id: &'a str,
        input: &'a ConnectionInput,
    ) -> BoxFuture<'a, Result<ConnectionOutput, ApiError>>;

    fn get_connection<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        incoming_asset_id: &'a str,
        connection_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ConnectionOutput>, ApiError>>;

    fn destroy_connection<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        incoming_asset_id: &'a str,
        connection_id: &'a str,
    ) -> BoxFuture<'a, Result<(), ApiError>>;
}

/// REST implementation of [`ControlPlane`]
#[derive(Clone)]
pub struct HttpControlPlane {
    pub http: ApiHttpClient,
    base_url: Url,
    debug: bool,
}

impl HttpControlPlane {
    /// Create a client for the API rooted at `base_url`, authenticating with
    /// a bearer token obtained by the caller
    pub fn new(base_url: Url, token: &str) -> Result<Self, ApiError> {
        Ok(Self {
            http: ApiHttpClient::new(token)?,
            base_url,
            debug: false,
        })
    }

    /// Client for the host and debug flag in `config`
    pub fn from_config(config: &Config, token: &str) -> anyhow::Result<Self> {
        Ok(Self::new(config.base_url()?, token)?.with_debug(config.effective_debug()))
    }

    /// Log request bodies at debug level
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build an API URL from raw path segments, percent-encoding each one
    pub fn api_url(&self, segments: &[&str]) -> String {
        let root = self.base_url.as_str().trim_end_matches('/');
        let path: Vec<String> = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!("{}/{}", root, path.join("/"))
    }

    /// Build the environment-scoped assets collection URL
    pub fn assets_url(&self, organization_id: &str, environment_id: &str) -> String {
        self.api_url(&[
            "organizations",
            organization_id,
            "environments",
            environment_id,
            "assets",
        ])
    }

    /// Build a single asset URL
    pub fn asset_url(&self, organization_id: &str, environment_id: &str, asset_id: &str) -> String {
        format!(
            "{}/{}",
            self.assets_url(organization_id, environment_id),
            urlencoding::encode(asset_id)
        )
    }

    /// Build the connections collection URL of an incoming asset
    pub fn connections_url(
        &self,
        organization_id: &str,
        environment_id: &str,
        incoming_asset_id: &str,
    ) -> String {
        format!(
            "{}/connections",
            self.asset_url(organization_id, environment_id, incoming_asset_id)
        )
    }

    /// Build a single connection URL
    pub fn connection_url(
        &self,
        organization_id: &str,
        environment_id: &str,
        incoming_asset_id: &str,
        connection_id: &str,
    ) -> String {
        format!(
            "{}/{}",
            self.connections_url(organization_id, environment_id, incoming_asset_id),
            urlencoding::encode(connection_id)
        )
    }

    fn log_request<T: serde::Serialize>(&self, operation: &str, body: &T) {
        if self.debug {
            match serde_json::to_string(body) {
                Ok(json) => tracing::debug!("{} request: {}", operation, json),
                Err(e) => tracing::debug!("{} request could not be serialized: {}", operation, e),
            }
        }
    }
}

fn require<T>(value: Option<T>, operation: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Body(format!("empty response to {}", operation)))
}

impl ControlPlane for HttpControlPlane {
    fn create_asset<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        input: &'a AssetInput,
    ) -> BoxFuture<'a, Result<AssetOutput, ApiError>> {
        async move {
            self.log_request("create asset", input);
            let url = self.assets_url(organization_id, environment_id);
            require(self.http.post(&url, input).await?, "create asset")
        }
        .boxed()
    }

    fn describe_asset<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        asset_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<AssetOutput>, ApiError>> {
        async move {
            let url = self.asset_url(organization_id, environment_id, asset_id);
            self.http.get(&url).await
        }
        .boxed()
    }

    fn update_asset<'a>(
        &'a self,
        asset_id: &'a str,
        environment_id: &'a str,
        organization_id: &'a str,
        input: &'a AssetInput,
    ) -> BoxFuture<'a, Result<AssetOutput, ApiError>> {
        async move {
            self.log_request("update asset", input);
            let url = self.asset_url(organization_id, environment_id, asset_id);
            require(self.http.put(&url, input).await?, "update asset")
        }
        .boxed()
    }

    fn destroy_asset<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        asset_id: &'a str,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        async move {
            let url = self.asset_url(organization_id, environment_id, asset_id);
            self.http.delete(&url).await
        }
        .boxed()
    }

    fn list_assets<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<AssetOutput>, ApiError>> {
        async move {
            let url = self.assets_url(organization_id, environment_id);
            Ok(self.http.get(&url).await?.unwrap_or_default())
        }
        .boxed()
    }

    fn create_connection<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        incoming_asset_id: &'a str,
        input: &'a ConnectionInput,
    ) -> BoxFuture<'a, Result<ConnectionOutput, ApiError>> {
        async move {
            self.log_request("create connection", input);
            let url = self.connections_url(organization_id, environment_id, incoming_asset_id);
            require(self.http.post(&url, input).await?, "create connection")
        }
        .boxed()
    }

    fn get_connection<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        incoming_asset_id: &'a str,
        connection_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ConnectionOutput>, ApiError>> {
        async move {
            let url = self.connection_url(
                organization_id,
                environment_id,
                incoming_asset_id,
                connection_id,
            );
            self.http.get(&url).await
        }
        .boxed()
    }

    fn destroy_connection<'a>(
        &'a self,
        organization_id: &'a str,
        environment_id: &'a str,
        incoming_asset_id: &'a str,
        connection_id: &'a str,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        async move {
            let url = self.connection_url(
                organization_id,
                environment_id,
                incoming_asset_id,
                connection_id,
            );
            self.http.delete(&url).await
        }
        .boxed()
    }
}
