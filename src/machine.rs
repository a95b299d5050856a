// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! List-then-watch wait loop, modeled as an explicit state machine
//!
//! The machine first consults a bootstrap list for an already-satisfying
//! object, then consumes watch events until the condition signals a verdict.
//! It has no deadline of its own; the gate wraps [`WaitMachine::run`] in a
//! timeout and cancels it by dropping the future, which releases the stream
//! and any in-flight list call.

use futures::StreamExt;
use tracing::{debug, trace};

use crate::error::WaitError;
use crate::event::{CrdEvent, Verdict, evaluate, evaluate_payload};
use crate::source::CrdSource;

/// Phase of the wait loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Consulting the bootstrap list
    Listing,
    /// Consuming watch events
    Watching,
    /// Target observed
    Done,
    /// Deadline elapsed before the target was observed
    TimedOut,
    /// A fatal condition or stream failure ended the wait
    Failed,
}

/// Drives one wait for one target name over a [`CrdSource`]
pub struct WaitMachine<'a, S> {
    source: &'a S,
    target: &'a str,
    state: WaitState,
}

impl<'a, S: CrdSource> WaitMachine<'a, S> {
    pub fn new(source: &'a S, target: &'a str) -> Self {
        Self {
            source,
            target,
            state: WaitState::Listing,
        }
    }

    /// Current phase; [`WaitState::TimedOut`] is recorded via
    /// [`mark_timed_out`](Self::mark_timed_out) by whoever owns the deadline.
    pub fn state(&self) -> WaitState {
        self.state
    }

    /// Record that the deadline elapsed while the machine was still running
    pub fn mark_timed_out(&mut self) {
        if !matches!(self.state, WaitState::Done | WaitState::Failed) {
            self.state = WaitState::TimedOut;
        }
    }

    /// Run the loop to a verdict. Returns `Ok(())` once the target is
    /// observed; never returns on its own if the watch stays silent, so the
    /// caller must bound it with a deadline.
    pub async fn run(&mut self) -> Result<(), WaitError> {
        let listing = match self.source.list(self.target).await {
            Ok(listing) => listing,
            Err(err) => {
                self.state = WaitState::Failed;
                return Err(WaitError::List(err));
            }
        };
        debug!(
            target_crd = self.target,
            listed = listing.items.len(),
            "bootstrap list complete"
        );
        for payload in &listing.items {
            match evaluate_payload(payload, self.target) {
                Verdict::Matched => {
                    self.state = WaitState::Done;
                    return Ok(());
                }
                Verdict::NotYet => {}
                Verdict::WrongKind => {
                    self.state = WaitState::Failed;
                    return Err(WaitError::InvalidType);
                }
            }
        }

        self.state = WaitState::Watching;
        let mut stream = match self.source.watch(self.target, &listing.resource_version).await {
            Ok(stream) => stream,
            Err(err) => {
                self.state = WaitState::Failed;
                return Err(WaitError::Watch(err));
            }
        };
        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(event) => event,
                Err(err) => {
                    self.state = WaitState::Failed;
                    return Err(WaitError::Watch(err));
                }
            };
            if let CrdEvent::Error(resp) = &event {
                self.state = WaitState::Failed;
                return Err(WaitError::Watch(anyhow::Error::new(resp.clone())));
            }
            match evaluate(&event, self.target) {
                Verdict::Matched => {
                    debug!(target_crd = self.target, "target CRD observed");
                    self.state = WaitState::Done;
                    return Ok(());
                }
                Verdict::NotYet => {
                    trace!(target_crd = self.target, ?event, "event did not match, still waiting");
                }
                Verdict::WrongKind => {
                    self.state = WaitState::Failed;
                    return Err(WaitError::InvalidType);
                }
            }
        }

        // Stream end is not a verdict; park until the deadline cancels us.
        futures::future::pending::<()>().await;
        unreachable!("pending future resolved")
    }
}
