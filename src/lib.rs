// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Bounded readiness gate for Kubernetes CustomResourceDefinitions
//!
//! Components that depend on a CRD being registered (operators, agents with
//! custom-resource-backed config) call [`ReadinessGate::wait`] at startup to
//! suspend until the definition is observable through the API server's
//! list/watch mechanism, bounded by a timeout:
//!
//! ```no_run
//! use crdgate::ReadinessGate;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let gate = ReadinessGate::new(client);
//! gate.wait("widgets.example.com", Duration::from_secs(30)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The wait is a single bounded attempt: list first, then watch, scoped to
//! the target name with a field selector. It ends with success, a timeout
//! carrying the name and configured duration, or an invalid-type error if
//! the stream delivers an object that is not a CRD. Nothing is retried
//! internally; callers that want retries call [`ReadinessGate::wait`] again.

mod error;
mod event;
mod gate;
mod machine;
mod source;

pub use error::{GateError, WaitError};
pub use event::{CrdEvent, CrdPayload, Verdict, evaluate, evaluate_payload};
pub use gate::{DEFAULT_WAIT_TIMEOUT, GateConfig, ReadinessGate};
pub use machine::{WaitMachine, WaitState};
pub use source::{ApiCrdSource, CrdListing, CrdSource};
