//! Publish-if-absent over a content-addressed store.
//!
//! ```text
//! ensure_published(source)
//!     │  h = ContentHash::of_source(source)
//!     ▼
//! in-flight slot for h ──(joined)──▶ wait for the winner's outcome
//!     │ (created)
//!     ▼
//! index hit? ── yes ──▶ stored handle
//!     │ no
//!     ▼
//! publisher.publish(source) ──▶ store.insert(h, handle) ──▶ handle
//! ```
//!
//! Every caller for `h` that overlaps the winner receives the winner's
//! outcome, success or failure. The slot is dropped once resolved: a failed
//! publish leaves no entry and the next call starts over.

use crate::handle::{DeploymentError, ModuleHandle, Publisher};
use crate::hash::ContentHash;
use crate::store::{RegistryStore, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;

/// Errors surfaced by [`Registry`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The task running a batch item panicked or was cancelled.
    #[error("registration task aborted: {0}")]
    Aborted(String),
}

type Outcome = Result<ModuleHandle, RegistryError>;
type Flight = Arc<OnceCell<Outcome>>;

/// Content-addressed module registry with single-flight publication.
pub struct Registry<S> {
    store: S,
    index: RwLock<BTreeMap<ContentHash, ModuleHandle>>,
    in_flight: Mutex<HashMap<ContentHash, Flight>>,
}

impl<S: RegistryStore> Registry<S> {
    /// Load persisted entries from `store`.
    pub async fn open(store: S) -> Result<Self, RegistryError> {
        let index = store.load().await?;
        tracing::debug!(entries = index.len(), "registry loaded");
        Ok(Self {
            store,
            index: RwLock::new(index),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The handle recorded for `hash`, if any.
    pub fn lookup(&self, hash: &ContentHash) -> Option<ModuleHandle> {
        self.read_index().get(hash).cloned()
    }

    /// The handle recorded for this exact source text, if any.
    pub fn lookup_source(&self, source: &str) -> Option<ModuleHandle> {
        self.lookup(&ContentHash::of_source(source))
    }

    /// All entries in hash order.
    pub fn entries(&self) -> Vec<(ContentHash, ModuleHandle)> {
        self.read_index()
            .iter()
            .map(|(hash, handle)| (*hash, handle.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_index().is_empty()
    }

    /// Return the handle for `source`, publishing it first if this content
    /// has never been published.
    ///
    /// At most one `publish` runs per content hash at a time; overlapping
    /// callers share its outcome.
    pub async fn ensure_published<P>(&self, source: &str, publisher: &P) -> Outcome
    where
        P: Publisher + ?Sized,
    {
        let hash = ContentHash::of_source(source);
        let flight = self.join_flight(hash);
        let outcome = flight
            .get_or_init(|| self.publish_once(hash, source, publisher))
            .await
            .clone();
        self.leave_flight(hash, &flight);
        outcome
    }

    async fn publish_once<P>(&self, hash: ContentHash, source: &str, publisher: &P) -> Outcome
    where
        P: Publisher + ?Sized,
    {
        if let Some(handle) = self.lookup(&hash) {
            tracing::debug!(content_hash = %hash, uri = %handle.uri, "registry hit");
            return Ok(handle);
        }

        tracing::info!(content_hash = %hash, "publishing module");
        let handle = publisher.publish(source).await.inspect_err(|err| {
            tracing::warn!(content_hash = %hash, error = %err, "publish failed");
        })?;

        let recorded = self.store.insert(hash, handle).await?;
        self.write_index().insert(hash, recorded.clone());
        tracing::info!(content_hash = %hash, uri = %recorded.uri, "module recorded");
        Ok(recorded)
    }

    fn join_flight(&self, hash: ContentHash) -> Flight {
        let mut in_flight = lock_unpoisoned(&self.in_flight);
        Arc::clone(in_flight.entry(hash).or_default())
    }

    fn leave_flight(&self, hash: ContentHash, flight: &Flight) {
        let mut in_flight = lock_unpoisoned(&self.in_flight);
        if let Some(current) = in_flight.get(&hash)
            && Arc::ptr_eq(current, flight)
        {
            in_flight.remove(&hash);
        }
    }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<ContentHash, ModuleHandle>> {
        self.index.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<ContentHash, ModuleHandle>> {
        self.index
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: RegistryStore + 'static> Registry<S> {
    /// Ensure every source is published, concurrently.
    ///
    /// Results line up with `sources`; one item failing never aborts the
    /// others.
    pub async fn ensure_published_batch<P>(
        self: &Arc<Self>,
        sources: Vec<String>,
        publisher: Arc<P>,
    ) -> Vec<Outcome>
    where
        P: Publisher + ?Sized + 'static,
    {
        let mut results: Vec<Option<Outcome>> = vec![None; sources.len()];
        let mut tasks = JoinSet::new();
        for (idx, source) in sources.into_iter().enumerate() {
            let registry = Arc::clone(self);
            let publisher = Arc::clone(&publisher);
            tasks.spawn(async move {
                let outcome = registry.ensure_published(&source, publisher.as_ref()).await;
                (idx, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => results[idx] = Some(outcome),
                Err(err) => tracing::error!(error = %err, "registration task aborted"),
            }
        }

        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(RegistryError::Aborted(
                        "task ended without a result".to_string(),
                    ))
                })
            })
            .collect()
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
