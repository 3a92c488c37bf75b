use core::any::Any;
use std::{collections::BTreeMap, sync::Arc, time::Instant};

use anyhow::Result;
use beacon_api::{BeaconNodeApi, HostPool};
use cache_store::CacheStore;
use log::{error, info, warn};
use types::{clock, nonstandard::DataKind, primitives::Epoch};

use crate::{
    ingestion_config::{IngestionConfig, Mode},
    schedule::EpochSchedule,
    worker::{Outcome, Worker},
};

/// Number of epochs per outcome for one data kind.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct OutcomeCounts {
    pub cached: usize,
    pub stored: usize,
    pub stored_bytes: usize,
    pub abandoned: usize,
    pub failed: usize,
    pub write_failed: usize,
    /// Worker tasks that panicked. Epochs they were processing are not counted elsewhere.
    pub panicked: usize,
}

impl OutcomeCounts {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Cached => self.cached += 1,
            Outcome::Stored { bytes } => {
                self.stored += 1;
                self.stored_bytes += bytes;
            }
            Outcome::Abandoned => self.abandoned += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::WriteFailed => self.write_failed += 1,
        }
    }

    fn merge(&mut self, other: Self) {
        let Self {
            cached,
            stored,
            stored_bytes,
            abandoned,
            failed,
            write_failed,
            panicked,
        } = other;

        self.cached += cached;
        self.stored += stored;
        self.stored_bytes += stored_bytes;
        self.abandoned += abandoned;
        self.failed += failed;
        self.write_failed += write_failed;
        self.panicked += panicked;
    }
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct RunSummary {
    pub dispatched: usize,
    pub outcomes: BTreeMap<DataKind, OutcomeCounts>,
}

/// Epoch the run starts from when descending or ends at when incremental.
///
/// Descending runs without an explicit head ask the beacon nodes for it.
pub async fn resolve_head<A: BeaconNodeApi>(
    config: &IngestionConfig,
    pool: &HostPool<A>,
) -> Result<Epoch> {
    match config.mode {
        Mode::Descending {
            head: Some(head), ..
        } => Ok(head),
        Mode::Descending { head: None, .. } => Ok(pool.chain_head().await?.head_epoch),
        Mode::Incremental { .. } => clock::current_epoch(&config.chain_config),
    }
}

pub async fn resolve_schedule<A: BeaconNodeApi>(
    config: &IngestionConfig,
    pool: &HostPool<A>,
) -> Result<EpochSchedule> {
    let head = resolve_head(config, pool).await?;

    let schedule = match config.mode {
        Mode::Descending { floor, .. } => EpochSchedule::descending(head, floor),
        Mode::Incremental { start } => EpochSchedule::ascending(start, head),
    };

    Ok(schedule.with_limit(config.limit))
}

/// Processes every scheduled epoch for every enabled data kind.
///
/// Each kind is served by its own fixed set of workers fed through a bounded queue.
/// Dispatching stops early once the time budget is spent. Work already queued is finished.
pub async fn run<A: BeaconNodeApi + 'static>(
    config: &IngestionConfig,
    pool: Arc<HostPool<A>>,
    store: Arc<CacheStore>,
) -> Result<RunSummary> {
    let started = Instant::now();
    let schedule = resolve_schedule(config, &pool).await?;

    let mut queues = vec![];
    let mut handles = vec![];

    for kind in config.kinds.iter().copied() {
        let (sender, receiver) = async_channel::bounded(config.queue_capacity.get());

        let worker = Arc::new(Worker::new(
            kind,
            Arc::clone(&pool),
            Arc::clone(&store),
            config.chain_config,
        ));

        for _ in 0..config.workers_per_kind.get() {
            let receiver = receiver.clone();
            let worker = Arc::clone(&worker);

            let handle = tokio::spawn(async move {
                let mut counts = OutcomeCounts::default();

                while let Ok(epoch) = receiver.recv().await {
                    counts.record(worker.process_epoch(epoch).await);
                }

                counts
            });

            handles.push((kind, handle));
        }

        queues.push((kind, sender));
    }

    let mut summary = RunSummary {
        outcomes: config
            .kinds
            .iter()
            .map(|kind| (*kind, OutcomeCounts::default()))
            .collect(),
        ..RunSummary::default()
    };

    for epoch in schedule {
        if let Some(budget) = config
            .time_budget
            .filter(|budget| started.elapsed() >= *budget)
        {
            info!("time budget of {budget:?} is spent; no more epochs will be dispatched");
            break;
        }

        for (kind, queue) in &queues {
            if queue.send(epoch).await.is_err() {
                warn!("no {kind} workers are left to process epoch {epoch}");
            }
        }

        summary.dispatched += 1;
    }

    for (_, queue) in &queues {
        queue.close();
    }

    for (kind, handle) in handles {
        let counts = match handle.await {
            Ok(counts) => counts,
            Err(join_error) => {
                match join_error.try_into_panic() {
                    Ok(payload) => error!("{kind} worker panicked: {}", panic_message(&*payload)),
                    Err(join_error) => error!("{kind} worker was cancelled: {join_error}"),
                }

                OutcomeCounts {
                    panicked: 1,
                    ..OutcomeCounts::default()
                }
            }
        };

        summary.outcomes.entry(kind).or_default().merge(counts);
    }

    let remaining_cycle = config
        .min_cycle
        .filter(|_| matches!(config.mode, Mode::Incremental { .. }))
        .and_then(|min_cycle| min_cycle.checked_sub(started.elapsed()));

    if let Some(remaining) = remaining_cycle {
        info!("waiting {remaining:?} before the next cycle");
        tokio::time::sleep(remaining).await;
    }

    info!(
        "dispatched {} epochs in {:?}: {:?}",
        summary.dispatched,
        started.elapsed(),
        summary.outcomes,
    );

    Ok(summary)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<String>() {
        return message;
    }

    payload
        .downcast_ref::<&str>()
        .copied()
        .unwrap_or("panic with payload of unknown type")
}
