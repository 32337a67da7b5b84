//! Connection Manager
//!
//! Connections are directed edges between two provisioned assets in the same
//! environment. The control plane creates them synchronously, so there is no
//! waiting phase, and they have no update: changing an endpoint means
//! destroying and recreating the edge.

use super::non_empty;
use crate::cloud::client::ControlPlane;
use crate::cloud::models::{ConnectionInput, ConnectionOutput};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Locally persisted view of a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub organization_id: String,
    pub environment_id: String,
    pub incoming_asset_id: String,
    pub outgoing_asset_id: String,
}

impl Connection {
    pub fn locator(&self) -> ConnectionLocator {
        ConnectionLocator {
            organization_id: self.organization_id.clone(),
            environment_id: self.environment_id.clone(),
            incoming_asset_id: self.incoming_asset_id.clone(),
            connection_id: self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionLocator {
    pub organization_id: String,
    pub environment_id: String,
    pub incoming_asset_id: String,
    pub connection_id: String,
}

pub struct ConnectionManager<'a, P: ControlPlane + ?Sized> {
    client: &'a P,
}

impl<'a, P: ControlPlane + ?Sized> ConnectionManager<'a, P> {
    pub fn new(client: &'a P) -> Self {
        Self { client }
    }

    pub async fn create(
        &self,
        organization_id: &str,
        environment_id: &str,
        incoming_asset_id: &str,
        outgoing_asset_id: &str,
    ) -> Result<Connection> {
        let input = ConnectionInput {
            outgoing_connection_asset_id: outgoing_asset_id.to_string(),
        };
        let output = self
            .client
            .create_connection(organization_id, environment_id, incoming_asset_id, &input)
            .await?;
        if output.id.is_empty() {
            return Err(Error::EmptyResponse {
                operation: "create connection",
            });
        }

        tracing::info!(
            "Connected {} -> {} ({})",
            incoming_asset_id,
            outgoing_asset_id,
            output.id
        );
        Ok(snapshot(&output, organization_id, environment_id, incoming_asset_id))
    }

    /// `None` when the connection no longer exists
    pub async fn describe(&self, locator: &ConnectionLocator) -> Result<Option<Connection>> {
        let response = self
            .client
            .get_connection(
                &locator.organization_id,
                &locator.environment_id,
                &locator.incoming_asset_id,
                &locator.connection_id,
            )
            .await;

        match response {
            Ok(Some(output)) => Ok(Some(snapshot(
                &output,
                &locator.organization_id,
                &locator.environment_id,
                &locator.incoming_asset_id,
            ))),
            Ok(None) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Destroying a connection that is already gone succeeds
    pub async fn destroy(&self, locator: &ConnectionLocator) -> Result<()> {
        let response = self
            .client
            .destroy_connection(
                &locator.organization_id,
                &locator.environment_id,
                &locator.incoming_asset_id,
                &locator.connection_id,
            )
            .await;

        match response {
            Ok(()) => {
                tracing::info!("Destroyed connection {}", locator.connection_id);
                Ok(())
            },
            Err(e) if e.is_not_found() => {
                tracing::info!("Connection {} was already gone", locator.connection_id);
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Move an existing connection to new endpoints
    pub async fn replace(
        &self,
        existing: &Connection,
        incoming_asset_id: &str,
        outgoing_asset_id: &str,
    ) -> Result<Connection> {
        self.destroy(&existing.locator()).await?;
        self.create(
            &existing.organization_id,
            &existing.environment_id,
            incoming_asset_id,
            outgoing_asset_id,
        )
        .await
    }
}

fn snapshot(
    output: &ConnectionOutput,
    organization_id: &str,
    environment_id: &str,
    incoming_asset_id: &str,
) -> Connection {
    let incoming = &output.incoming_connection_asset;
    Connection {
        id: output.id.clone(),
        organization_id: non_empty(&incoming.environment.organization.id, organization_id),
        environment_id: non_empty(&incoming.environment.id, environment_id),
        incoming_asset_id: non_empty(&incoming.id, incoming_asset_id),
        outgoing_asset_id: output.outgoing_connection_asset.id.clone(),
    }
}
