//! Status Waiter
//!
//! Polls an asset until it reaches one of the statuses a [`WaitTarget`]
//! accepts. The decision logic lives in [`WaitMachine`], which knows nothing
//! about clocks or I/O; [`Waiter`] drives it with `tokio` timers and a
//! [`ControlPlane`] client.

use super::asset::AssetLocator;
use crate::cloud::client::ControlPlane;
use crate::cloud::models::{AssetOutput, AssetStatus};
use crate::error::{ApiError, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    30 * 60
}

fn default_max_invalid_responses() -> u32 {
    3
}

/// Polling knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Ceiling on the whole wait
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Consecutive unusable responses tolerated before giving up
    #[serde(default = "default_max_invalid_responses")]
    pub max_invalid_responses: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
            max_invalid_responses: default_max_invalid_responses(),
        }
    }
}

impl WaitPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Statuses that end a wait successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTarget {
    success: AssetStatus,
    /// A 404 means the asset is gone, which is what a destroy waits for
    not_found_is_success: bool,
}

impl WaitTarget {
    /// Create and update
    pub fn deployed() -> Self {
        Self {
            success: AssetStatus::Deployed,
            not_found_is_success: false,
        }
    }

    /// Delete
    pub fn destroyed() -> Self {
        Self {
            success: AssetStatus::Destroyed,
            not_found_is_success: true,
        }
    }

    pub fn success_status(&self) -> AssetStatus {
        self.success
    }
}

/// What to do after one observation
#[derive(Debug)]
pub enum Transition {
    /// Still in progress; poll again after the delay
    Continue(Duration),
    /// Terminal success. `None` when the asset is already gone.
    Succeeded(Option<AssetOutput>),
    Failed(Error),
}

/// Pure polling state machine for one wait
#[derive(Debug, Clone)]
pub struct WaitMachine {
    asset_id: String,
    target: WaitTarget,
    policy: WaitPolicy,
    invalid_responses: u32,
    polls: u32,
}

impl WaitMachine {
    pub fn new(asset_id: &str, target: WaitTarget, policy: WaitPolicy) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            target,
            policy,
            invalid_responses: 0,
            polls: 0,
        }
    }

    /// Number of observations so far
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Fails once `elapsed` reaches the ceiling. Checked before every poll.
    pub fn check_deadline(&self, elapsed: Duration) -> Result<()> {
        if elapsed >= self.policy.timeout() {
            return Err(Error::WaitTimedOut {
                asset_id: self.asset_id.clone(),
                elapsed,
            });
        }
        Ok(())
    }

    pub fn observe(&mut self, response: Result<Option<AssetOutput>, ApiError>) -> Transition {
        self.polls += 1;

        match response {
            Ok(Some(output)) => {
                self.invalid_responses = 0;
                if output.status == AssetStatus::Failed {
                    Transition::Failed(Error::ProvisioningFailed {
                        asset_id: self.asset_id.clone(),
                    })
                } else if output.status == self.target.success {
                    Transition::Succeeded(Some(output))
                } else {
                    tracing::debug!(
                        "Asset {} is {}, waiting for {}",
                        self.asset_id,
                        output.status,
                        self.target.success
                    );
                    Transition::Continue(self.policy.poll_interval())
                }
            },
            Ok(None) => self.invalid("empty response body".to_string()),
            Err(e) if e.is_not_found() && self.target.not_found_is_success => {
                Transition::Succeeded(None)
            },
            Err(e) if e.is_transient() || e.is_not_found() => self.invalid(e.to_string()),
            Err(e) => Transition::Failed(Error::Transport(e)),
        }
    }

    fn invalid(&mut self, reason: String) -> Transition {
        self.invalid_responses += 1;
        if self.invalid_responses > self.policy.max_invalid_responses {
            return Transition::Failed(Error::StatusUnavailable {
                asset_id: self.asset_id.clone(),
                attempts: self.invalid_responses,
                last: reason,
            });
        }

        tracing::warn!(
            "Unusable status response for asset {} ({}/{}): {}",
            self.asset_id,
            self.invalid_responses,
            self.policy.max_invalid_responses,
            reason
        );
        Transition::Continue(self.policy.poll_interval())
    }
}

/// Drives a [`WaitMachine`] against a control plane
pub struct Waiter<'a, P: ControlPlane + ?Sized> {
    client: &'a P,
    policy: WaitPolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, P: ControlPlane + ?Sized> Waiter<'a, P> {
    pub fn new(client: &'a P, policy: WaitPolicy) -> Self {
        Self {
            client,
            policy,
            cancel: None,
        }
    }

    /// Stop waiting once the channel holds `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Poll until `target` is reached. Returns the final description, or
    /// `None` when a destroy wait found the asset already gone.
    pub async fn wait(
        &mut self,
        locator: &AssetLocator,
        target: WaitTarget,
    ) -> Result<Option<AssetOutput>> {
        let asset_id = locator.asset_id.as_str();
        let started = Instant::now();
        let deadline = started + self.policy.timeout();
        let mut machine = WaitMachine::new(asset_id, target, self.policy.clone());

        tracing::info!("Waiting for asset {} to reach {}", asset_id, target.success);

        loop {
            if self.is_cancelled() {
                return Err(Error::WaitCancelled {
                    asset_id: asset_id.to_string(),
                });
            }
            machine.check_deadline(started.elapsed())?;

            let response = self
                .client
                .describe_asset(&locator.organization_id, &locator.environment_id, asset_id)
                .await;

            match machine.observe(response) {
                Transition::Succeeded(output) => {
                    tracing::info!(
                        "Asset {} reached {} after {} poll(s)",
                        asset_id,
                        target.success,
                        machine.polls()
                    );
                    return Ok(output);
                },
                Transition::Failed(e) => return Err(e),
                Transition::Continue(delay) => {
                    let wake = std::cmp::min(Instant::now() + delay, deadline);
                    self.pause(wake, asset_id).await?;
                },
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    async fn pause(&mut self, wake: Instant, asset_id: &str) -> Result<()> {
        let Some(rx) = self.cancel.as_mut() else {
            tokio::time::sleep_until(wake).await;
            return Ok(());
        };

        let sleep = tokio::time::sleep_until(wake);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                changed = rx.changed() => match changed {
                    Ok(()) if *rx.borrow_and_update() => {
                        tracing::info!("Wait for asset {} cancelled", asset_id);
                        return Err(Error::WaitCancelled {
                            asset_id: asset_id.to_string(),
                        });
                    },
                    Ok(()) => continue,
                    // Sender dropped; nobody can cancel any more
                    Err(_) => {
                        sleep.as_mut().await;
                        return Ok(());
                    },
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::models::EnvironmentRef;

    fn output(status: AssetStatus) -> AssetOutput {
        AssetOutput {
            id: "a1".to_string(),
            asset: "aws__vpc__latest".to_string(),
            asset_version: "latest".to_string(),
            environment: EnvironmentRef::default(),
            status,
            current_asset_parameters: None,
            outputs: None,
        }
    }

    fn machine(target: WaitTarget) -> WaitMachine {
        WaitMachine::new("a1", target, WaitPolicy::default())
    }

    #[test]
    fn test_policy_defaults() {
        let policy: WaitPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, WaitPolicy::default());
        assert_eq!(policy.poll_interval(), Duration::from_secs(10));
        assert_eq!(policy.timeout(), Duration::from_secs(1800));
        assert_eq!(policy.max_invalid_responses, 3);
    }

    #[test]
    fn test_pending_continues_then_deployed_succeeds() {
        let mut m = machine(WaitTarget::deployed());
        assert!(matches!(
            m.observe(Ok(Some(output(AssetStatus::Pending)))),
            Transition::Continue(d) if d == Duration::from_secs(10)
        ));
        assert!(matches!(
            m.observe(Ok(Some(output(AssetStatus::Deployed)))),
            Transition::Succeeded(Some(_))
        ));
        assert_eq!(m.polls(), 2);
    }

    #[test]
    fn test_unknown_status_is_still_in_progress() {
        let mut m = machine(WaitTarget::deployed());
        assert!(matches!(
            m.observe(Ok(Some(output(AssetStatus::Unknown)))),
            Transition::Continue(_)
        ));
    }

    #[test]
    fn test_failed_is_terminal_for_every_target() {
        for target in [WaitTarget::deployed(), WaitTarget::destroyed()] {
            let mut m = machine(target);
            match m.observe(Ok(Some(output(AssetStatus::Failed)))) {
                Transition::Failed(Error::ProvisioningFailed { asset_id }) => {
                    assert_eq!(asset_id, "a1")
                },
                other => panic!("expected ProvisioningFailed, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_invalid_responses_are_bounded() {
        let mut m = machine(WaitTarget::deployed());
        for _ in 0..3 {
            assert!(matches!(m.observe(Ok(None)), Transition::Continue(_)));
        }
        match m.observe(Err(ApiError::status(503, "unavailable"))) {
            Transition::Failed(Error::StatusUnavailable { attempts, last, .. }) => {
                assert_eq!(attempts, 4);
                assert!(last.contains("503"));
            },
            other => panic!("expected StatusUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_usable_response_resets_invalid_count() {
        let mut m = machine(WaitTarget::deployed());
        for _ in 0..3 {
            m.observe(Ok(None));
        }
        m.observe(Ok(Some(output(AssetStatus::Pending))));
        for _ in 0..3 {
            assert!(matches!(m.observe(Ok(None)), Transition::Continue(_)));
        }
    }

    #[test]
    fn test_not_found_depends_on_target() {
        let mut deploy = machine(WaitTarget::deployed());
        assert!(matches!(
            deploy.observe(Err(ApiError::status(404, "missing"))),
            Transition::Continue(_)
        ));

        let mut destroy = machine(WaitTarget::destroyed());
        assert!(matches!(
            destroy.observe(Err(ApiError::status(404, "missing"))),
            Transition::Succeeded(None)
        ));
    }

    #[test]
    fn test_non_transient_error_propagates() {
        let mut m = machine(WaitTarget::deployed());
        assert!(matches!(
            m.observe(Err(ApiError::status(403, "forbidden"))),
            Transition::Failed(Error::Transport(_))
        ));
    }

    #[test]
    fn test_deadline() {
        let m = machine(WaitTarget::deployed());
        assert!(m.check_deadline(Duration::from_secs(1799)).is_ok());
        assert!(matches!(
            m.check_deadline(Duration::from_secs(1800)),
            Err(Error::WaitTimedOut { .. })
        ));
    }

    #[test]
    fn test_destroy_wait_ignores_deployed() {
        let mut m = machine(WaitTarget::destroyed());
        assert!(matches!(
            m.observe(Ok(Some(output(AssetStatus::Deployed)))),
            Transition::Continue(_)
        ));
        assert!(matches!(
            m.observe(Ok(Some(output(AssetStatus::Destroyed)))),
            Transition::Succeeded(Some(_))
        ));
    }
}
