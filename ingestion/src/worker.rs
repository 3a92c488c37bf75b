use std::{sync::Arc, time::Instant};

use anyhow::Result;
use artifacts::Artifact;
use beacon_api::{BeaconNodeApi, HostPool};
use cache_store::CacheStore;
use log::{info, warn};
use types::{
    clock, config::ChainConfig, containers::EpochBlocks, nonstandard::DataKind,
    primitives::Epoch,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// A valid artifact was already stored. Nothing was requested.
    Cached,
    Stored { bytes: usize },
    /// Every host failed to provide the data.
    Abandoned,
    /// The data could not be normalized or encoded.
    Failed,
    WriteFailed,
}

/// Fetches and stores artifacts of one kind.
pub struct Worker<A> {
    kind: DataKind,
    pool: Arc<HostPool<A>>,
    store: Arc<CacheStore>,
    chain_config: ChainConfig,
}

impl<A: BeaconNodeApi> Worker<A> {
    #[must_use]
    pub const fn new(
        kind: DataKind,
        pool: Arc<HostPool<A>>,
        store: Arc<CacheStore>,
        chain_config: ChainConfig,
    ) -> Self {
        Self {
            kind,
            pool,
            store,
            chain_config,
        }
    }

    pub async fn process_epoch(&self, epoch: Epoch) -> Outcome {
        let started = Instant::now();
        let kind = self.kind;
        let key = kind.cache_key(epoch);

        if self.store.has(&key).await {
            info!(
                "{kind} for epoch {epoch} is already cached, skipping (took {:?})",
                started.elapsed(),
            );

            return Outcome::Cached;
        }

        let outcome = match self.fetch(epoch).await {
            None => Outcome::Abandoned,
            Some(Err(error)) => {
                warn!("{kind} for epoch {epoch} could not be prepared for storage: {error:?}");
                Outcome::Failed
            }
            Some(Ok(bytes)) => {
                let length = bytes.len();

                match self.store.set(&key, bytes).await {
                    Ok(()) => Outcome::Stored { bytes: length },
                    Err(error) => {
                        warn!("failed to write {key} to {}: {error:?}", self.store.describe());
                        Outcome::WriteFailed
                    }
                }
            }
        };

        info!(
            "{kind} for epoch {epoch} finished with {outcome:?} in {:?} (beacon node: {})",
            started.elapsed(),
            self.pool.current().await.url(),
        );

        outcome
    }

    // `None` means the epoch was abandoned. Errors come from normalization and encoding only.
    async fn fetch(&self, epoch: Epoch) -> Option<Result<Vec<u8>>> {
        let kind = self.kind;
        let pool = &self.pool;

        let artifact = match kind {
            DataKind::Duties => {
                let pages = pool
                    .request_with_failover(kind, epoch, |api| async move {
                        api.epoch_assignments(epoch).await
                    })
                    .await?;

                assignment_codec::wire_to_dense(epoch, &pages).map(Artifact::Duties)
            }
            DataKind::Balances => pool
                .request_with_failover(kind, epoch, |api| async move {
                    api.balances_for_epoch(epoch).await
                })
                .await
                .map(Artifact::Balances)
                .map(Ok)?,
            DataKind::Validators => pool
                .request_with_failover(kind, epoch, |api| async move {
                    api.epoch_validators(epoch).await
                })
                .await
                .map(Artifact::Validators)
                .map(Ok)?,
            DataKind::Blocks => {
                let slots = clock::slots_in_epoch(&self.chain_config, epoch);

                pool.request_with_failover(kind, epoch, |api| {
                    let slots = slots.clone();

                    async move {
                        let mut blocks = EpochBlocks::new();

                        for slot in slots {
                            blocks.insert(slot, api.blocks_by_slot(slot).await?);
                        }

                        Ok::<_, anyhow::Error>(blocks)
                    }
                })
                .await
                .map(Artifact::Blocks)
                .map(Ok)?
            }
        };

        Some(artifact.and_then(|artifact| artifact.encode()))
    }
}

#[cfg(test)]
pub mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::collections::HashSet;

    use anyhow::bail;
    use async_trait::async_trait;
    use futures::lock::Mutex;
    use types::{
        assignments::{CommitteeDuty, ValidatorDuty, WireAssignments},
        containers::{Balances, Block, ChainHead, Validator},
        primitives::{Slot, H256},
        redacting_url::RedactingUrl,
    };

    use super::*;

    fn scramble(value: u64) -> u64 {
        value.wrapping_mul(0x9E37_79B9_7F4A_7C15) % 1_000_003
    }

    /// Beacon node serving synthetic data for any epoch.
    pub struct MockNode {
        url: RedactingUrl,
        healthy: bool,
        pub calls: AtomicUsize,
        pub requested_slots: Mutex<HashSet<Slot>>,
    }

    impl MockNode {
        pub fn new(port: u16, healthy: bool) -> Result<Self> {
            Ok(Self {
                url: format!("http://node-{port}.test:{port}").parse()?,
                healthy,
                calls: AtomicUsize::new(0),
                requested_slots: Mutex::default(),
            })
        }

        fn respond<T>(&self, value: impl FnOnce() -> T) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if !self.healthy {
                bail!("connection refused");
            }

            Ok(value())
        }
    }

    #[async_trait]
    impl BeaconNodeApi for MockNode {
        fn url(&self) -> &RedactingUrl {
            &self.url
        }

        async fn node_version(&self) -> Result<String> {
            self.respond(|| "Mock/v0.1.0".to_owned())
        }

        async fn chain_head(&self) -> Result<ChainHead> {
            self.respond(|| ChainHead {
                head_epoch: 10,
                head_slot: 320,
                ..ChainHead::default()
            })
        }

        async fn epoch_assignments(&self, epoch: Epoch) -> Result<Vec<WireAssignments>> {
            self.respond(|| {
                let mut duties = vec![];

                for slot in epoch * 32..(epoch + 1) * 32 {
                    for committee_index in 0..4 {
                        let committee = (0..64)
                            .map(|member| scramble(slot * 256 + committee_index * 64 + member))
                            .collect::<Arc<[_]>>();

                        duties.extend(committee.iter().map(|validator_index| ValidatorDuty {
                            validator_index: *validator_index,
                            attestation: Some(CommitteeDuty {
                                attester_slot: slot,
                                committee_index,
                                committee: Arc::clone(&committee),
                            }),
                            proposer_slots: vec![],
                        }));
                    }

                    duties.push(ValidatorDuty {
                        validator_index: slot % 100,
                        attestation: None,
                        proposer_slots: vec![slot],
                    });
                }

                vec![WireAssignments {
                    epoch,
                    duties,
                    next_page_token: String::new(),
                    total_size: 32 * (4 * 64 + 1),
                }]
            })
        }

        async fn balances_for_epoch(&self, epoch: Epoch) -> Result<Balances> {
            self.respond(|| {
                (0..1000)
                    .map(|index| (index, 32_000_000_000 + index * 7919 + epoch))
                    .collect()
            })
        }

        async fn epoch_validators(&self, _epoch: Epoch) -> Result<Vec<Validator>> {
            self.respond(Vec::new)
        }

        async fn blocks_by_slot(&self, slot: Slot) -> Result<Vec<Block>> {
            self.requested_slots.lock().await.insert(slot);

            self.respond(|| {
                vec![Block {
                    slot,
                    proposer: slot % 1000,
                    block_root: H256::from_low_u64_be(scramble(slot)),
                    parent_root: H256::from_low_u64_be(scramble(slot + 1)),
                    state_root: H256::from_low_u64_be(scramble(slot ^ 0xff)),
                    ..Block::default()
                }]
            })
        }
    }

    pub fn pool(health: &[bool]) -> Result<Arc<HostPool<MockNode>>> {
        let nodes = (1..)
            .zip(health)
            .map(|(port, healthy)| MockNode::new(port, *healthy))
            .collect::<Result<Vec<_>>>()?;

        Ok(Arc::new(HostPool::new(nodes)?))
    }

    fn worker(kind: DataKind, pool: &Arc<HostPool<MockNode>>) -> Worker<MockNode> {
        Worker::new(
            kind,
            Arc::clone(pool),
            Arc::new(CacheStore::in_memory()),
            ChainConfig::mainnet(),
        )
    }

    #[tokio::test]
    async fn second_run_is_served_from_cache() -> Result<()> {
        let pool = pool(&[true])?;
        let worker = worker(DataKind::Balances, &pool);

        let first = worker.process_epoch(3).await;
        let second = worker.process_epoch(3).await;

        assert!(matches!(first, Outcome::Stored { .. }));
        assert_eq!(second, Outcome::Cached);
        assert_eq!(pool.current().await.calls.load(Ordering::SeqCst), 1);

        let stored = artifacts::load_balances(&worker.store, 3).await?;

        assert_eq!(stored.len(), 1000);
        assert_eq!(stored.get(&1), Some(&(32_000_000_000 + 7919 + 3)));

        Ok(())
    }

    #[tokio::test]
    async fn empty_validator_set_is_cached_like_any_other() -> Result<()> {
        let pool = pool(&[true])?;
        let worker = worker(DataKind::Validators, &pool);

        let first = worker.process_epoch(3).await;
        let second = worker.process_epoch(3).await;

        assert!(matches!(first, Outcome::Stored { .. }));
        assert_eq!(second, Outcome::Cached);
        assert_eq!(pool.current().await.calls.load(Ordering::SeqCst), 1);
        assert_eq!(artifacts::load_validators(&worker.store, 3).await?, []);

        Ok(())
    }

    #[tokio::test]
    async fn epoch_is_abandoned_after_every_host_fails() -> Result<()> {
        let pool = pool(&[false, false, false])?;
        let worker = worker(DataKind::Validators, &pool);

        assert_eq!(worker.process_epoch(3).await, Outcome::Abandoned);
        assert!(!worker.store.has(&DataKind::Validators.cache_key(3)).await);

        Ok(())
    }

    #[tokio::test]
    async fn duties_are_normalized_before_storage() -> Result<()> {
        let pool = pool(&[true])?;
        let worker = worker(DataKind::Duties, &pool);

        assert!(matches!(worker.process_epoch(100).await, Outcome::Stored { .. }));

        let assignments = artifacts::load_assignments(&worker.store, 100).await?;

        assert_eq!(assignments.first_slot, Some(3200));
        assert_eq!(assignments.num_slots, 32);
        assert_eq!(assignments.num_assignments, 32 * (4 * 64 + 1));
        assert_eq!(assignments.proposer_at(3201), Some(1));
        assert_eq!(assignments.validator_at(3200, 0, 0), Some(scramble(3200 * 256)));
        assert_eq!(assignments.validator_at(3231, 3, 63), Some(scramble(3231 * 256 + 255)));

        Ok(())
    }

    #[tokio::test]
    async fn blocks_cover_every_slot_of_the_epoch() -> Result<()> {
        let pool = pool(&[true])?;
        let worker = worker(DataKind::Blocks, &pool);

        assert!(matches!(worker.process_epoch(2).await, Outcome::Stored { .. }));

        let node = pool.current().await;
        let requested = node.requested_slots.lock().await.clone();

        assert_eq!(requested, (64..96).collect());
        assert_eq!(node.calls.load(Ordering::SeqCst), 32);

        let Artifact::Blocks(blocks) =
            artifacts::load(&worker.store, DataKind::Blocks, 2).await?
        else {
            bail!("blocks artifact should decode as blocks");
        };

        assert_eq!(blocks.keys().copied().collect::<Vec<_>>(), (64..96).collect::<Vec<_>>());

        Ok(())
    }
}
