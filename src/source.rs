// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! List/watch capability the gate waits on
//!
//! The gate never talks to the API server directly; it drives a [`CrdSource`],
//! which scopes both the list and the watch to the target name with a
//! `metadata.name` field selector. The production implementation wraps a
//! cluster-wide `Api<CustomResourceDefinition>`; tests substitute scripted
//! sources.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::{Api, Client};

use crate::event::{CrdEvent, CrdPayload};

/// Build the field selector restricting a list/watch to one object name
fn name_selector(name: &str) -> String {
    format!("metadata.name={name}")
}

/// Result of the bootstrap list call
#[derive(Debug, Clone)]
pub struct CrdListing {
    /// Objects currently matching the name filter (zero or one on a real
    /// API server; fakes may return more)
    pub items: Vec<CrdPayload>,
    /// Collection resourceVersion to resume the watch from, so no change
    /// between list and watch is missed
    pub resource_version: String,
}

/// List/watch access to CustomResourceDefinitions, scoped per call to a
/// single target name
#[async_trait]
pub trait CrdSource: Send + Sync {
    /// Fetch the objects currently matching `name`
    async fn list(&self, name: &str) -> Result<CrdListing>;

    /// Open a watch for changes to objects matching `name`, starting at
    /// `resource_version`. The stream stays open until dropped.
    async fn watch(
        &self,
        name: &str,
        resource_version: &str,
    ) -> Result<BoxStream<'static, Result<CrdEvent>>>;
}

/// [`CrdSource`] backed by the cluster API via `kube`
pub struct ApiCrdSource {
    api: Api<CustomResourceDefinition>,
}

impl ApiCrdSource {
    /// Create a source over the cluster-scoped CRD API
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl CrdSource for ApiCrdSource {
    async fn list(&self, name: &str) -> Result<CrdListing> {
        let lp = ListParams::default().fields(&name_selector(name));
        let list = self
            .api
            .list(&lp)
            .await
            .with_context(|| format!("listing CustomResourceDefinitions matching {name}"))?;
        let resource_version = list.metadata.resource_version.unwrap_or_else(|| "0".to_string());
        let items = list
            .items
            .into_iter()
            .map(|crd| CrdPayload::Crd(Box::new(crd)))
            .collect();
        Ok(CrdListing {
            items,
            resource_version,
        })
    }

    async fn watch(
        &self,
        name: &str,
        resource_version: &str,
    ) -> Result<BoxStream<'static, Result<CrdEvent>>> {
        let wp = WatchParams::default().fields(&name_selector(name));
        let stream = self
            .api
            .watch(&wp, resource_version)
            .await
            .with_context(|| format!("starting watch for CustomResourceDefinition {name}"))?;
        // The typed client deserializes every object as a CRD, so payloads
        // here are always the expected kind; Foreign only ever comes from a
        // miswired or fake source.
        Ok(stream
            .map(|item| match item {
                Ok(WatchEvent::Added(crd)) => Ok(CrdEvent::Added(CrdPayload::Crd(Box::new(crd)))),
                Ok(WatchEvent::Modified(crd)) => {
                    Ok(CrdEvent::Modified(CrdPayload::Crd(Box::new(crd))))
                }
                Ok(WatchEvent::Deleted(crd)) => {
                    Ok(CrdEvent::Deleted(CrdPayload::Crd(Box::new(crd))))
                }
                Ok(WatchEvent::Bookmark(_)) => Ok(CrdEvent::Bookmark),
                Ok(WatchEvent::Error(resp)) => Ok(CrdEvent::Error(resp)),
                Err(err) => {
                    Err(anyhow::Error::new(err).context("reading CustomResourceDefinition watch stream"))
                }
            })
            .boxed())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Scripted sources shared by the machine and gate tests

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures::stream;

    use super::*;
    use kube::core::TypeMeta;

    pub(crate) fn crd_named(name: &str) -> CrdPayload {
        let mut crd = CustomResourceDefinition::default();
        crd.metadata.name = Some(name.to_string());
        CrdPayload::Crd(Box::new(crd))
    }

    pub(crate) fn foreign_payload() -> CrdPayload {
        CrdPayload::Foreign(TypeMeta {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
        })
    }

    /// Sets a flag when dropped; used to verify the watch stream is released
    /// on every exit path.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Scripted [`CrdSource`]: a fixed list result, then a fixed sequence of
    /// watch items. After the scripted items the stream stays open like a
    /// real watch, unless `end_stream` is set.
    pub(crate) struct FakeSource {
        pub(crate) listed: Vec<CrdPayload>,
        pub(crate) list_error: Option<String>,
        pub(crate) events: Mutex<Vec<Result<CrdEvent>>>,
        pub(crate) end_stream: bool,
        pub(crate) watch_calls: AtomicUsize,
        pub(crate) watch_dropped: Arc<AtomicBool>,
    }

    impl FakeSource {
        pub(crate) fn new(listed: Vec<CrdPayload>, events: Vec<Result<CrdEvent>>) -> Self {
            Self {
                listed,
                list_error: None,
                events: Mutex::new(events),
                end_stream: false,
                watch_calls: AtomicUsize::new(0),
                watch_dropped: Arc::new(AtomicBool::new(false)),
            }
        }

        pub(crate) fn watch_count(&self) -> usize {
            self.watch_calls.load(Ordering::SeqCst)
        }

        pub(crate) fn watch_was_dropped(&self) -> bool {
            self.watch_dropped.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CrdSource for FakeSource {
        async fn list(&self, _name: &str) -> Result<CrdListing> {
            if let Some(msg) = &self.list_error {
                anyhow::bail!("{msg}");
            }
            Ok(CrdListing {
                items: self.listed.clone(),
                resource_version: "1".to_string(),
            })
        }

        async fn watch(
            &self,
            _name: &str,
            _resource_version: &str,
        ) -> Result<BoxStream<'static, Result<CrdEvent>>> {
            self.watch_calls.fetch_add(1, Ordering::SeqCst);
            let scripted: Vec<Result<CrdEvent>> =
                self.events.lock().expect("events lock poisoned").drain(..).collect();
            let held = DropFlag(self.watch_dropped.clone());
            let stream = if self.end_stream {
                stream::iter(scripted)
                    .map(move |item| {
                        let _held = &held;
                        item
                    })
                    .boxed()
            } else {
                stream::iter(scripted)
                    .chain(stream::pending())
                    .map(move |item| {
                        let _held = &held;
                        item
                    })
                    .boxed()
            };
            Ok(stream)
        }
    }
}
