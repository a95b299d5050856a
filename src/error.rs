// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Error taxonomy for the readiness gate
//!
//! Everything is returned to the caller; the gate never logs-and-swallows.
//! Timeout is the retryable case (the caller decides whether to call again);
//! a wrong-kind payload is a contract violation and is terminal.

use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal outcome of a single [`ReadinessGate::wait`](crate::ReadinessGate::wait) call
#[derive(Debug, Error)]
pub enum GateError {
    /// The deadline elapsed before the CRD was observed, or the watch failed
    /// after the wait had begun (the failure is attached as `source`).
    #[error("timeout waiting for CRD {name} after {timeout:?}")]
    Timeout {
        /// Target CRD name
        name: String,
        /// Timeout the call was configured with
        timeout: Duration,
        /// Watch failure that cut the wait short, if any
        #[source]
        source: Option<BoxError>,
    },

    /// The stream delivered an object that is not a CustomResourceDefinition.
    /// This means the watch source is miswired; retrying will not help.
    #[error("object delivered while waiting for CRD {name} is not a CustomResourceDefinition")]
    InvalidType {
        /// Target CRD name
        name: String,
    },

    /// The initial list call failed before the wait loop started
    #[error("listing CustomResourceDefinitions while waiting for {name} failed")]
    List {
        /// Target CRD name
        name: String,
        #[source]
        source: BoxError,
    },
}

impl GateError {
    /// Whether a caller-side retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GateError::Timeout { .. } | GateError::List { .. } => true,
            GateError::InvalidType { .. } => false,
        }
    }
}

/// Why the wait loop stopped without observing the target; mapped onto
/// [`GateError`] by the gate, which knows the name and configured timeout.
#[derive(Debug)]
pub enum WaitError {
    /// List call failed (before the event loop started)
    List(anyhow::Error),
    /// Watch setup or stream failed (after the wait had begun)
    Watch(anyhow::Error),
    /// A payload of unexpected kind was observed
    InvalidType,
}
