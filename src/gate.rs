// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Bounded wait entry points
//!
//! A [`ReadinessGate`] owns a [`CrdSource`] and a [`GateConfig`], and exposes
//! one operation: suspend until the named CRD is observable or the deadline
//! passes. Components that must not start before their CRDs exist call this
//! during startup and treat a timeout as fatal; retries are the caller's
//! decision.

use std::time::Duration;

use kube::Client;
use tracing::debug;

use crate::error::{GateError, WaitError};
use crate::machine::WaitMachine;
use crate::source::{ApiCrdSource, CrdSource};

/// Default bound for [`ReadinessGate::wait_default`]; roughly the window in
/// which a freshly started agent is expected to find its CRDs registered.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Gate tuning; passed in explicitly so tests can shorten the default
/// timeout without touching global state
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Timeout applied by [`ReadinessGate::wait_default`]
    pub default_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Waits for a named CustomResourceDefinition to become observable
pub struct ReadinessGate<S> {
    source: S,
    config: GateConfig,
}

impl ReadinessGate<ApiCrdSource> {
    /// Gate over the cluster API with the default configuration
    pub fn new(client: Client) -> Self {
        Self::with_source(ApiCrdSource::new(client))
    }
}

impl<S: CrdSource> ReadinessGate<S> {
    /// Gate over an arbitrary source with the default configuration
    pub fn with_source(source: S) -> Self {
        Self::with_config(source, GateConfig::default())
    }

    pub fn with_config(source: S, config: GateConfig) -> Self {
        Self { source, config }
    }

    /// Suspend until the CRD called `name` is observed, or `timeout` passes.
    ///
    /// A zero timeout fails with [`GateError::Timeout`] as soon as the
    /// underlying calls are attempted. Concurrent waits are independent;
    /// each owns its deadline and its watch subscription, and both are
    /// released on every exit path.
    pub async fn wait(&self, name: &str, timeout: Duration) -> Result<(), GateError> {
        debug!(target_crd = name, ?timeout, "waiting for CRD to become observable");
        let mut machine = WaitMachine::new(&self.source, name);
        let outcome = tokio::time::timeout(timeout, machine.run()).await;
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(WaitError::InvalidType)) => Err(GateError::InvalidType {
                name: name.to_string(),
            }),
            Ok(Err(WaitError::List(err))) => Err(GateError::List {
                name: name.to_string(),
                source: err.into(),
            }),
            Ok(Err(WaitError::Watch(err))) => Err(GateError::Timeout {
                name: name.to_string(),
                timeout,
                source: Some(err.into()),
            }),
            Err(_elapsed) => {
                machine.mark_timed_out();
                Err(GateError::Timeout {
                    name: name.to_string(),
                    timeout,
                    source: None,
                })
            }
        }
    }

    /// [`wait`](Self::wait) with the configured default timeout
    pub async fn wait_default(&self, name: &str) -> Result<(), GateError> {
        self.wait(name, self.config.default_timeout).await
    }
}
