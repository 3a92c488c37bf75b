use core::time::Duration;
use std::path::PathBuf;

use anyhow::Result;
use cache_store::{CacheStore, S3Location};
use ingestion::{IngestionConfig, Mode};
use itertools::Itertools as _;
use log::info;
use types::redacting_url::RedactingUrl;

#[cfg_attr(test, derive(Debug))]
pub struct CacherConfig {
    pub beacon_urls: Vec<RedactingUrl>,
    pub request_timeout: Duration,
    pub storage_config: StorageConfig,
    pub ingestion_config: IngestionConfig,
    pub print_head: bool,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum StorageConfig {
    Filesystem { directory: PathBuf },
    ObjectStorage { bucket: String, prefix: String },
    InMemory,
}

impl StorageConfig {
    pub fn open(self) -> Result<CacheStore> {
        let store = match self {
            Self::Filesystem { directory } => CacheStore::filesystem(directory),
            Self::ObjectStorage { bucket, prefix } => {
                CacheStore::object_storage(S3Location::from_env(&bucket, &prefix)?)
            }
            Self::InMemory => CacheStore::in_memory(),
        };

        Ok(store)
    }
}

impl CacherConfig {
    pub fn report(&self) {
        let Self {
            beacon_urls,
            request_timeout,
            storage_config,
            ingestion_config,
            print_head,
        } = self;

        let IngestionConfig {
            chain_config,
            mode,
            kinds,
            limit,
            workers_per_kind,
            queue_capacity,
            time_budget,
            min_cycle,
        } = ingestion_config;

        info!("beacon node URLs: [{}]", beacon_urls.iter().format(", "));
        info!("request timeout: {request_timeout:?}");

        if *print_head {
            return;
        }

        match storage_config {
            StorageConfig::Filesystem { directory } => info!("cache directory: {directory:?}"),
            StorageConfig::ObjectStorage { bucket, prefix } => {
                info!("cache bucket: {bucket} (key prefix: {prefix:?})");
            }
            StorageConfig::InMemory => info!("artifacts are kept in memory and discarded on exit"),
        }

        info!(
            "chain genesis time: {}, seconds per slot: {}",
            chain_config.genesis_time, chain_config.seconds_per_slot,
        );

        match mode {
            Mode::Descending {
                head: Some(head),
                floor,
            } => info!("processing epochs {head} down to {floor}"),
            Mode::Descending { head: None, floor } => {
                info!("processing epochs from the chain head down to {floor}");
            }
            Mode::Incremental { start } => {
                info!("processing epochs from {start} up to the current epoch");
            }
        }

        info!("data kinds: [{}]", kinds.iter().format(", "));
        info!("workers per kind: {workers_per_kind}, queue capacity: {queue_capacity}");

        if let Some(limit) = limit {
            info!("epoch limit: {limit}");
        }

        if let Some(time_budget) = time_budget {
            info!("time budget: {time_budget:?}");
        }

        if let Some(min_cycle) = min_cycle {
            info!("minimum cycle duration: {min_cycle:?}");
        }
    }
}
