// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Watch event payloads and the terminal condition for the CRD wait loop
//!
//! The watch stream can in principle deliver objects that are not
//! CustomResourceDefinitions (a misconfigured source, or a fake client in
//! tests). Instead of downcasting, payloads are a tagged union so the
//! "expected kind or not" decision is a plain match.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::core::{ErrorResponse, TypeMeta};

/// Payload carried by a watch event or returned by a list call
#[derive(Debug, Clone)]
pub enum CrdPayload {
    /// A CustomResourceDefinition, the only kind the gate understands
    Crd(Box<CustomResourceDefinition>),
    /// An object of some other kind; only its type identity is retained
    Foreign(TypeMeta),
}

impl CrdPayload {
    /// Object name, if the payload is a CRD with one set
    pub fn name(&self) -> Option<&str> {
        match self {
            CrdPayload::Crd(crd) => crd.metadata.name.as_deref(),
            CrdPayload::Foreign(_) => None,
        }
    }
}

/// A single change notification from the watch stream
///
/// Mirrors the Kubernetes watch protocol event types. `Error` carries the
/// server's status payload for error frames delivered in-band.
#[derive(Debug, Clone)]
pub enum CrdEvent {
    /// Object was added
    Added(CrdPayload),
    /// Object was modified
    Modified(CrdPayload),
    /// Object was deleted
    Deleted(CrdPayload),
    /// Progress bookmark; carries no object
    Bookmark,
    /// In-band error frame from the server
    Error(ErrorResponse),
}

impl CrdEvent {
    /// The payload for events that carry one
    pub fn payload(&self) -> Option<&CrdPayload> {
        match self {
            CrdEvent::Added(p) | CrdEvent::Modified(p) | CrdEvent::Deleted(p) => Some(p),
            CrdEvent::Bookmark | CrdEvent::Error(_) => None,
        }
    }
}

/// Outcome of evaluating one event or listed object against the target name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The target CRD was observed; the wait is over
    Matched,
    /// A CRD was observed but it is not the target; keep waiting
    NotYet,
    /// The payload is not a CustomResourceDefinition; fatal
    WrongKind,
}

/// Decide whether a listed payload satisfies the wait for the CRD `name`.
///
/// The name comparison is kept even though the server-side field selector
/// already restricts results: fake clients used in tests do not apply field
/// selectors and deliver every object.
pub fn evaluate_payload(payload: &CrdPayload, name: &str) -> Verdict {
    match payload {
        CrdPayload::Crd(_) if payload.name() == Some(name) => Verdict::Matched,
        CrdPayload::Crd(_) => Verdict::NotYet,
        CrdPayload::Foreign(_) => Verdict::WrongKind,
    }
}

/// Decide whether a watch event satisfies the wait for the CRD `name`.
///
/// Never blocks. Events without a payload (bookmarks, error frames) are
/// `NotYet` here; error frames are handled by the wait loop before this is
/// consulted. Any event type counts, including `Deleted`: observing the
/// object at all proves the definition is registered and watchable.
pub fn evaluate(event: &CrdEvent, name: &str) -> Verdict {
    match event.payload() {
        Some(payload) => evaluate_payload(payload, name),
        None => Verdict::NotYet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crd_named(name: &str) -> CrdPayload {
        let mut crd = CustomResourceDefinition::default();
        crd.metadata.name = Some(name.to_string());
        CrdPayload::Crd(Box::new(crd))
    }

    fn foreign() -> CrdPayload {
        CrdPayload::Foreign(TypeMeta {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
        })
    }

    #[test]
    fn test_matching_name_is_matched() {
        let ev = CrdEvent::Added(crd_named("widgets.example.com"));
        assert_eq!(evaluate(&ev, "widgets.example.com"), Verdict::Matched);
    }

    #[test]
    fn test_other_name_is_not_yet() {
        let ev = CrdEvent::Modified(crd_named("gadgets.example.com"));
        assert_eq!(evaluate(&ev, "widgets.example.com"), Verdict::NotYet);
    }

    #[test]
    fn test_deleted_target_still_counts_as_observed() {
        let ev = CrdEvent::Deleted(crd_named("widgets.example.com"));
        assert_eq!(evaluate(&ev, "widgets.example.com"), Verdict::Matched);
    }

    #[test]
    fn test_foreign_kind_is_fatal() {
        let ev = CrdEvent::Added(foreign());
        assert_eq!(evaluate(&ev, "widgets.example.com"), Verdict::WrongKind);
    }

    #[test]
    fn test_bookmark_is_skipped() {
        assert_eq!(evaluate(&CrdEvent::Bookmark, "widgets.example.com"), Verdict::NotYet);
    }

    #[test]
    fn test_crd_without_name_is_not_yet() {
        let payload = CrdPayload::Crd(Box::new(CustomResourceDefinition::default()));
        assert_eq!(evaluate_payload(&payload, "widgets.example.com"), Verdict::NotYet);
    }
}
