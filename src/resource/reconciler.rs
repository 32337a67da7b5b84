//! Reconciler
//!
//! One generic create/read/update/delete flow for every asset kind. The kind
//! supplies coordinates and the parameter codec; the reconciler issues the
//! remote calls, waits for each transition to settle, and hands snapshots
//! back to the caller for persistence.

use super::asset::{Asset, AssetLocator, Checkpoint, Desired};
use super::codec::{merge_for_update, AssetKind};
use super::identifier::{self, Coordinates};
use super::non_empty;
use super::params::{ParamAccess, ParameterBag};
use super::waiter::{WaitPolicy, WaitTarget, Waiter};
use crate::cloud::client::ControlPlane;
use crate::cloud::models::{AssetInput, AssetOutput, AssetStatus};
use crate::error::{Error, Result};
use tokio::sync::watch;

/// Fallbacks for snapshot fields the control plane left out of a response
struct Scope<'s> {
    organization_id: &'s str,
    environment_id: &'s str,
    coordinates: &'s Coordinates,
}

pub struct Reconciler<'a, P: ControlPlane + ?Sized, K: AssetKind> {
    client: &'a P,
    kind: &'a K,
    policy: WaitPolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, P: ControlPlane + ?Sized, K: AssetKind> Reconciler<'a, P, K> {
    pub fn new(client: &'a P, kind: &'a K, policy: WaitPolicy) -> Self {
        Self {
            client,
            kind,
            policy,
            cancel: None,
        }
    }

    /// Abort waits once the channel holds `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn waiter(&self) -> Waiter<'a, P> {
        let waiter = Waiter::new(self.client, self.policy.clone());
        match &self.cancel {
            Some(rx) => waiter.with_cancellation(rx.clone()),
            None => waiter,
        }
    }

    /// Create the asset and wait for it to deploy.
    ///
    /// `checkpoint` receives a snapshot as soon as the id is assigned and again
    /// once the asset is deployed. If the wait fails the first snapshot is all
    /// the caller gets, and it must be kept.
    pub async fn create(
        &self,
        desired: &Desired<K::Config>,
        checkpoint: &mut impl Checkpoint<K::Config>,
    ) -> Result<Asset<K::Config>> {
        let coordinates = desired.coordinates(&self.kind.coordinates())?;
        let input = AssetInput {
            asset: coordinates.type_identifier(),
            asset_version: coordinates.version.clone(),
            asset_parameters: self.kind.encode(&desired.config),
            connects_to: desired.connects_to.clone(),
        };
        let scope = Scope {
            organization_id: &desired.organization_id,
            environment_id: &desired.environment_id,
            coordinates: &coordinates,
        };

        tracing::info!(
            "Creating {} in environment {}",
            input.asset,
            desired.environment_id
        );
        let response = self
            .client
            .create_asset(&desired.organization_id, &desired.environment_id, &input)
            .await?;
        if response.id.is_empty() {
            return Err(Error::EmptyResponse { operation: "create" });
        }
        tracing::info!("Created {} with id {}", input.asset, response.id);

        let initial = self.initial_snapshot(&response, &scope, &input, &desired.config);
        checkpoint.save(&initial);

        let settled = self
            .waiter()
            .wait(&initial.locator(), WaitTarget::deployed())
            .await?;
        let asset = match settled {
            Some(output) => self.snapshot(&output, &scope)?,
            None => initial,
        };
        checkpoint.save(&asset);
        Ok(asset)
    }

    /// Refresh a snapshot from the control plane. `None` means the asset no
    /// longer exists and should be dropped from local state.
    pub async fn read(&self, locator: &AssetLocator) -> Result<Option<Asset<K::Config>>> {
        let response = self
            .client
            .describe_asset(
                &locator.organization_id,
                &locator.environment_id,
                &locator.asset_id,
            )
            .await;

        let output = match response {
            Ok(Some(output)) if output.status != AssetStatus::Destroyed => output,
            Ok(_) => return Ok(None),
            Err(e) if e.is_not_found() => {
                tracing::info!("Asset {} not found", locator.asset_id);
                return Ok(None);
            },
            Err(e) => return Err(e.into()),
        };

        let coordinates = identifier::parse(&output.asset)
            .unwrap_or_else(|| self.kind.coordinates());
        let scope = Scope {
            organization_id: &locator.organization_id,
            environment_id: &locator.environment_id,
            coordinates: &coordinates,
        };
        self.snapshot(&output, &scope).map(Some)
    }

    /// Apply `desired` to an existing asset in place and wait for it to
    /// redeploy.
    ///
    /// Parameters the control plane holds but `desired` does not declare are
    /// sent back unchanged.
    pub async fn update(
        &self,
        desired: &Desired<K::Config>,
        last_known: &Asset<K::Config>,
        checkpoint: &mut impl Checkpoint<K::Config>,
    ) -> Result<Asset<K::Config>> {
        let coordinates = desired.coordinates(&self.kind.coordinates())?;
        check_immutable(desired, &coordinates, last_known)?;

        let locator = last_known.locator();
        let remote = match self
            .client
            .describe_asset(
                &locator.organization_id,
                &locator.environment_id,
                &locator.asset_id,
            )
            .await
        {
            Ok(output) => output.map(|o| o.parameters()),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };
        if remote.is_none() {
            tracing::warn!(
                "No remote parameters for asset {}, sending declared parameters only",
                locator.asset_id
            );
        }

        let input = AssetInput {
            asset: coordinates.type_identifier(),
            asset_version: coordinates.version.clone(),
            asset_parameters: merge_for_update(self.kind.encode(&desired.config), remote.as_ref()),
            connects_to: desired.connects_to.clone(),
        };
        tracing::info!(
            "Updating asset {} with {} parameter(s)",
            locator.asset_id,
            input.asset_parameters.len()
        );

        let response = self
            .client
            .update_asset(
                &locator.asset_id,
                &locator.environment_id,
                &locator.organization_id,
                &input,
            )
            .await?;

        let scope = Scope {
            organization_id: &locator.organization_id,
            environment_id: &locator.environment_id,
            coordinates: &coordinates,
        };
        let mut initial = self.initial_snapshot(&response, &scope, &input, &desired.config);
        if initial.id.is_empty() {
            initial.id = locator.asset_id.clone();
        }
        checkpoint.save(&initial);

        let settled = self
            .waiter()
            .wait(&locator, WaitTarget::deployed())
            .await?;
        let asset = match settled {
            Some(output) => self.snapshot(&output, &scope)?,
            None => initial,
        };
        checkpoint.save(&asset);
        Ok(asset)
    }

    /// Destroy the asset and wait until the control plane confirms it is gone.
    /// On success the caller drops its local state.
    pub async fn delete(&self, locator: &AssetLocator) -> Result<()> {
        tracing::info!("Destroying asset {}", locator.asset_id);
        match self
            .client
            .destroy_asset(
                &locator.organization_id,
                &locator.environment_id,
                &locator.asset_id,
            )
            .await
        {
            Ok(()) => {},
            Err(e) if e.is_not_found() => {
                tracing::info!("Asset {} was already gone", locator.asset_id);
                return Ok(());
            },
            Err(e) => return Err(e.into()),
        }

        self.waiter().wait(locator, WaitTarget::destroyed()).await?;
        tracing::info!("Asset {} destroyed", locator.asset_id);
        Ok(())
    }

    /// Find an asset of this kind by its name parameter
    pub async fn find_by_name(
        &self,
        organization_id: &str,
        environment_id: &str,
        name: &str,
    ) -> Result<Option<Asset<K::Config>>> {
        let coordinates = self.kind.coordinates();
        let assets = self
            .client
            .list_assets(organization_id, environment_id)
            .await?;

        let found = assets.iter().find(|output| {
            identifier::matches(&output.asset, &coordinates.platform, &coordinates.kind)
                && output.parameters().string(self.kind.name_key()) == name
        });
        let Some(output) = found else {
            tracing::debug!("No {} named {} in {}", coordinates, name, environment_id);
            return Ok(None);
        };

        let coordinates = identifier::parse(&output.asset).unwrap_or(coordinates);
        let scope = Scope {
            organization_id,
            environment_id,
            coordinates: &coordinates,
        };
        self.snapshot(output, &scope).map(Some)
    }

    /// Adopt an existing asset from an `organization_id,environment_id,asset_id`
    /// import id
    pub async fn import(&self, import_id: &str) -> Result<Asset<K::Config>> {
        let locator = AssetLocator::from_import_id(import_id)?;
        let asset = self.read(&locator).await?.ok_or_else(|| Error::AssetNotFound {
            asset_id: locator.asset_id.clone(),
        })?;

        let coordinates = self.kind.coordinates();
        if !identifier::matches(&asset.type_identifier, &coordinates.platform, &coordinates.kind)
        {
            return Err(Error::KindMismatch {
                asset_id: asset.id,
                expected: coordinates.to_string(),
                found: asset.type_identifier,
            });
        }

        tracing::info!("Imported asset {}", asset.id);
        Ok(asset)
    }

    /// Snapshot of a settled description. Decode failures are errors.
    fn snapshot(&self, output: &AssetOutput, scope: &Scope<'_>) -> Result<Asset<K::Config>> {
        let parameters = output.parameters();
        let config = self.kind.decode(&parameters)?;
        Ok(self.assemble(output, scope, config, parameters))
    }

    /// Snapshot of a mutating call's response. Never fails, so the id always
    /// reaches the checkpoint.
    fn initial_snapshot(
        &self,
        output: &AssetOutput,
        scope: &Scope<'_>,
        input: &AssetInput,
        declared: &K::Config,
    ) -> Asset<K::Config> {
        let mut parameters = output.parameters();
        if parameters.is_empty() {
            parameters = input.asset_parameters.clone();
        }
        let config = match self.kind.decode(&parameters) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Could not decode response for asset {} ({}), keeping declared config",
                    output.id,
                    e
                );
                declared.clone()
            },
        };
        self.assemble(output, scope, config, parameters)
    }

    fn assemble(
        &self,
        output: &AssetOutput,
        scope: &Scope<'_>,
        config: K::Config,
        parameters: ParameterBag,
    ) -> Asset<K::Config> {
        Asset {
            id: output.id.clone(),
            type_identifier: non_empty(&output.asset, &scope.coordinates.type_identifier()),
            version: non_empty(&output.asset_version, &scope.coordinates.version),
            environment_id: non_empty(&output.environment.id, scope.environment_id),
            organization_id: non_empty(&output.environment.organization.id, scope.organization_id),
            status: output.status,
            config,
            parameters,
            outputs: self.kind.select_outputs(&output.output_values()),
        }
    }
}

/// Fields that can only change by destroying and recreating the asset
fn check_immutable<C>(
    desired: &Desired<C>,
    coordinates: &Coordinates,
    last_known: &Asset<C>,
) -> Result<()> {
    let changed = |field: &str| {
        Err(Error::ImmutableFieldChanged {
            field: field.to_string(),
        })
    };

    match identifier::parse(&last_known.type_identifier) {
        Some(known) if known.platform != coordinates.platform => return changed("platform"),
        Some(known) if known.kind != coordinates.kind => return changed("kind"),
        Some(_) => {},
        None => return changed("platform"),
    }
    if last_known.version != coordinates.version {
        return changed("version");
    }
    if last_known.environment_id != desired.environment_id {
        return changed("environment_id");
    }
    if last_known.organization_id != desired.organization_id {
        return changed("organization_id");
    }
    Ok(())
}
