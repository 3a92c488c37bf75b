use core::{
    fmt::Display,
    num::{NonZeroU64, NonZeroUsize},
    time::Duration,
};
use std::path::PathBuf;

use anyhow::{ensure, Result};
use cache_store::DEFAULT_PREFIX;
use clap::{error::ErrorKind, Args, CommandFactory as _, Error as ClapError, Parser};
use ingestion::{IngestionConfig, Mode, DEFAULT_FLOOR_EPOCH};
use itertools::Itertools as _;
use thiserror::Error;
use types::{
    config::ChainConfig,
    nonstandard::DataKind,
    primitives::{Epoch, UnixSeconds},
    redacting_url::RedactingUrl,
};

use crate::{
    cacher_config::{CacherConfig, StorageConfig},
    consts::{APPLICATION_NAME, APPLICATION_VERSION, DEFAULT_CACHE_DIR, DEFAULT_REQUEST_TIMEOUT},
};

/// Caches per-epoch beacon chain data fetched from one or more beacon nodes
#[derive(Parser)]
#[clap(display_name = APPLICATION_NAME, version = APPLICATION_VERSION)]
pub struct CacherArgs {
    #[clap(flatten)]
    beacon_node_options: BeaconNodeOptions,

    #[clap(flatten)]
    range_options: RangeOptions,

    #[clap(flatten)]
    kind_options: KindOptions,

    #[clap(flatten)]
    storage_options: StorageOptions,

    #[clap(flatten)]
    chain_options: ChainOptions,

    /// Print the head epoch the run would start from to standard output and exit
    #[clap(long)]
    head: bool,
}

#[derive(Args)]
struct BeaconNodeOptions {
    /// Beacon node API URLs. Later ones are used when earlier ones fail.
    #[clap(long, value_delimiter = ',', required = true, value_name = "URL")]
    beacon_urls: Vec<RedactingUrl>,

    /// Timeout for requests to beacon nodes in milliseconds
    #[clap(long, default_value_t = BeaconNodeOptions::default_timeout())]
    request_timeout: u64,

    /// Number of concurrent workers for each kind of data
    #[clap(long, default_value_t = IngestionConfig::default().workers_per_kind)]
    workers_per_kind: NonZeroUsize,

    /// Number of epochs queued for each kind of data
    #[clap(long, default_value_t = IngestionConfig::default().queue_capacity)]
    queue_capacity: NonZeroUsize,
}

impl BeaconNodeOptions {
    fn default_timeout() -> u64 {
        DEFAULT_REQUEST_TIMEOUT
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX)
    }
}

#[derive(Args)]
struct RangeOptions {
    /// Epoch to start from. Replaces the chain head unless --incremental is passed.
    #[clap(long, value_name = "EPOCH")]
    start_epoch: Option<Epoch>,

    /// Lowest epoch to process when going back from the head
    #[clap(long, value_name = "EPOCH", default_value_t = DEFAULT_FLOOR_EPOCH)]
    floor_epoch: Epoch,

    /// Process epochs in ascending order up to the current one
    #[clap(long)]
    incremental: bool,

    /// Maximum number of epochs to process
    #[clap(long)]
    limit: Option<u64>,

    /// Stop queuing epochs after this many minutes
    #[clap(long, value_name = "MINUTES")]
    time_budget: Option<u64>,

    /// Minimum duration of an incremental run in minutes
    #[clap(long, value_name = "MINUTES", requires = "incremental")]
    min_cycle: Option<u64>,
}

#[expect(
    clippy::struct_excessive_bools,
    reason = "False positive. The `bool`s are independent."
)]
#[derive(Args)]
struct KindOptions {
    /// Do not cache validator duties
    #[clap(long)]
    no_duties: bool,

    /// Do not cache validator balances
    #[clap(long)]
    no_balances: bool,

    /// Do not cache validator records
    #[clap(long)]
    no_validators: bool,

    /// Do not cache blocks
    #[clap(long)]
    no_blocks: bool,
}

impl KindOptions {
    const fn is_enabled(&self, kind: DataKind) -> bool {
        let disabled = match kind {
            DataKind::Duties => self.no_duties,
            DataKind::Balances => self.no_balances,
            DataKind::Validators => self.no_validators,
            DataKind::Blocks => self.no_blocks,
        };

        !disabled
    }
}

#[derive(Args)]
struct StorageOptions {
    /// Directory to store artifacts in
    #[clap(long, value_name = "DIRECTORY", default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// S3 bucket to store artifacts in instead of --cache-dir.
    /// Credentials, region and endpoint are read from the standard AWS environment variables.
    #[clap(long, env = "AWS_S3_BUCKET")]
    s3_bucket: Option<String>,

    /// Prefix of artifact keys in the S3 bucket
    #[clap(long, env = "S3_PREFIX", default_value = DEFAULT_PREFIX)]
    s3_prefix: String,

    /// Keep artifacts in memory and discard them on exit
    #[clap(long)]
    in_memory: bool,
}

#[derive(Args)]
struct ChainOptions {
    /// Genesis time of the chain as a Unix timestamp
    #[clap(long, default_value_t = ChainConfig::mainnet().genesis_time)]
    genesis_time: UnixSeconds,

    #[clap(long, default_value_t = ChainConfig::mainnet().seconds_per_slot)]
    seconds_per_slot: NonZeroU64,
}

impl CacherArgs {
    pub fn try_into_config(self) -> Result<CacherConfig> {
        let Self {
            beacon_node_options,
            range_options,
            kind_options,
            storage_options,
            chain_options,
            head,
        } = self;

        let BeaconNodeOptions {
            beacon_urls,
            request_timeout,
            workers_per_kind,
            queue_capacity,
        } = beacon_node_options;

        let RangeOptions {
            start_epoch,
            floor_epoch,
            incremental,
            limit,
            time_budget,
            min_cycle,
        } = range_options;

        let StorageOptions {
            cache_dir,
            s3_bucket,
            s3_prefix,
            in_memory,
        } = storage_options;

        let ChainOptions {
            genesis_time,
            seconds_per_slot,
        } = chain_options;

        let kinds = enum_iterator::all::<DataKind>()
            .filter(|kind| kind_options.is_enabled(*kind))
            .collect_vec();

        ensure!(!kinds.is_empty(), Error::NoDataKinds);

        let mode = if incremental {
            Mode::Incremental {
                start: start_epoch.unwrap_or(DEFAULT_FLOOR_EPOCH),
            }
        } else {
            if let Some(start_epoch) = start_epoch {
                ensure!(
                    start_epoch >= floor_epoch,
                    Error::StartBelowFloor {
                        start_epoch,
                        floor_epoch,
                    },
                );
            }

            Mode::Descending {
                head: start_epoch,
                floor: floor_epoch,
            }
        };

        let storage_config = match (in_memory, s3_bucket) {
            (true, Some(_)) => return Err(Error::ConflictingStorage.into()),
            (true, None) => StorageConfig::InMemory,
            (false, Some(bucket)) => {
                ensure!(!bucket.is_empty(), Error::EmptyBucketName);

                StorageConfig::ObjectStorage {
                    bucket,
                    prefix: s3_prefix,
                }
            }
            (false, None) => StorageConfig::Filesystem {
                directory: cache_dir,
            },
        };

        let chain_config = ChainConfig::mainnet()
            .with_genesis_time(genesis_time)
            .with_seconds_per_slot(seconds_per_slot);

        Ok(CacherConfig {
            beacon_urls,
            request_timeout: Duration::from_millis(request_timeout),
            storage_config,
            ingestion_config: IngestionConfig {
                chain_config,
                mode,
                kinds,
                limit,
                workers_per_kind,
                queue_capacity,
                time_budget: time_budget.map(minutes),
                min_cycle: min_cycle.map(minutes),
            },
            print_head: head,
        })
    }

    pub fn clap_error(message: impl Display) -> ClapError {
        Self::command().error(ErrorKind::ValueValidation, message)
    }
}

const fn minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

#[derive(Debug, Error)]
enum Error {
    #[error("all kinds of data are disabled; nothing would be cached")]
    NoDataKinds,
    #[error("--start-epoch {start_epoch} is below --floor-epoch {floor_epoch}")]
    StartBelowFloor { start_epoch: Epoch, floor_epoch: Epoch },
    // `clap` cannot check this because --s3-bucket may also come from the environment.
    #[error("--in-memory cannot be combined with an S3 bucket")]
    ConflictingStorage,
    #[error("S3 bucket name must not be empty")]
    EmptyBucketName,
}
