use core::future::Future;
use std::{collections::HashMap, sync::Arc};

use anyhow::{ensure, Error as AnyhowError, Result};
use futures::lock::Mutex;
use log::{info, warn};
use types::{
    containers::ChainHead, nonstandard::DataKind, primitives::Epoch,
    redacting_url::RedactingUrl,
};

use crate::{api::BeaconNodeApi, error::Error};

pub enum Failover<A> {
    Retry(Arc<A>),
    Abandon,
}

/// Equivalent beacon nodes used in rotation.
///
/// Every `(kind, epoch)` pair gets one attempt per host. Failure counts are kept for the lifetime
/// of the pool.
pub struct HostPool<A> {
    hosts: Vec<Arc<A>>,
    state: Mutex<PoolState>,
}

#[derive(Default)]
struct PoolState {
    current: usize,
    failures: HashMap<(DataKind, Epoch), usize>,
}

impl<A: BeaconNodeApi> HostPool<A> {
    pub fn new(hosts: impl IntoIterator<Item = A>) -> Result<Self> {
        let hosts = hosts.into_iter().map(Arc::new).collect::<Vec<_>>();

        ensure!(!hosts.is_empty(), Error::NoReachableHosts);

        Ok(Self {
            hosts,
            state: Mutex::default(),
        })
    }

    /// Builds a pool out of the hosts that answer a version request.
    pub async fn connect(
        urls: impl IntoIterator<Item = RedactingUrl>,
        connector: impl Fn(RedactingUrl) -> Result<A>,
    ) -> Result<Self> {
        let mut hosts = vec![];

        for url in urls {
            let host = match connector(url.clone()) {
                Ok(host) => host,
                Err(error) => {
                    warn!("beacon node {url} cannot be used: {error}");
                    continue;
                }
            };

            match host.node_version().await {
                Ok(version) => {
                    info!("connected to beacon node {url} running {version}");
                    hosts.push(host);
                }
                Err(error) => {
                    warn!("beacon node {url} is unreachable and will be skipped: {error}");
                }
            }
        }

        Self::new(hosts)
    }

    pub async fn current(&self) -> Arc<A> {
        let state = self.state.lock().await;
        Arc::clone(&self.hosts[state.current])
    }

    pub async fn advance(&self) -> Arc<A> {
        let mut state = self.state.lock().await;
        let previous = state.current;
        let next = self.rotate(&mut state);

        if state.current != previous {
            info!(
                "switching from beacon node {} to {}",
                self.hosts[previous].url(),
                next.url(),
            );
        }

        next
    }

    /// Counts a failed attempt by `failed` and picks the host for the next one.
    ///
    /// Rotation only happens if `failed` is still the current host. Another request may have
    /// moved past it already, in which case the retry goes to the host it moved to.
    pub async fn record_failure(
        &self,
        kind: DataKind,
        epoch: Epoch,
        failed: &Arc<A>,
        error: &AnyhowError,
    ) -> Failover<A> {
        let mut state = self.state.lock().await;

        let failures = state.failures.entry((kind, epoch)).or_default();
        *failures += 1;
        let failures = *failures;

        let next = if Arc::ptr_eq(&self.hosts[state.current], failed) {
            self.rotate(&mut state)
        } else {
            Arc::clone(&self.hosts[state.current])
        };

        if failures < self.hosts.len() {
            warn!(
                "beacon node {} failed to provide {kind} for epoch {epoch}: {error}; \
                 retrying with {}",
                failed.url(),
                next.url(),
            );

            Failover::Retry(next)
        } else {
            warn!(
                "abandoning {kind} for epoch {epoch} after {failures} failed attempts; \
                 last beacon node {} returned an error: {error}",
                failed.url(),
            );

            Failover::Abandon
        }
    }

    /// Runs `request` on the current host and on the following ones until it succeeds.
    ///
    /// Returns `None` once every host has failed for `(kind, epoch)`.
    pub async fn request_with_failover<T, F, R>(
        &self,
        kind: DataKind,
        epoch: Epoch,
        request: F,
    ) -> Option<T>
    where
        F: Fn(Arc<A>) -> R + Send + Sync,
        R: Future<Output = Result<T>> + Send,
    {
        let mut host = self.current().await;

        loop {
            match request(Arc::clone(&host)).await {
                Ok(value) => return Some(value),
                Err(error) => match self.record_failure(kind, epoch, &host, &error).await {
                    Failover::Retry(next) => host = next,
                    Failover::Abandon => return None,
                },
            }
        }
    }

    /// Asks every host once, starting with the current one.
    pub async fn chain_head(&self) -> Result<ChainHead> {
        for _ in 0..self.hosts.len() {
            let host = self.current().await;

            match host.chain_head().await {
                Ok(chain_head) => return Ok(chain_head),
                Err(error) => {
                    warn!("beacon node {} failed to provide the chain head: {error}", host.url());
                    self.advance().await;
                }
            }
        }

        Err(Error::ChainHeadUnavailable.into())
    }

    #[must_use]
    pub fn hosts(&self) -> Vec<RedactingUrl> {
        self.hosts.iter().map(|host| host.url().clone()).collect()
    }

    fn rotate(&self, state: &mut PoolState) -> Arc<A> {
        state.current = (state.current + 1) % self.hosts.len();
        Arc::clone(&self.hosts[state.current])
    }
}
