use core::{num::NonZeroUsize, time::Duration};

use nonzero_ext::nonzero;
use types::{config::ChainConfig, nonstandard::DataKind, primitives::Epoch};

/// Lowest epoch processed by default. Nothing is cached for genesis.
pub const DEFAULT_FLOOR_EPOCH: Epoch = 1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Walk back from the head. `head` overrides the chain head reported by the beacon nodes.
    Descending { head: Option<Epoch>, floor: Epoch },
    /// Walk forward from `start` up to the epoch estimated from the clock.
    Incremental { start: Epoch },
}

impl Default for Mode {
    fn default() -> Self {
        Self::Descending {
            head: None,
            floor: DEFAULT_FLOOR_EPOCH,
        }
    }
}

#[derive(Clone, Debug)]
pub struct IngestionConfig {
    pub chain_config: ChainConfig,
    pub mode: Mode,
    pub kinds: Vec<DataKind>,
    pub limit: Option<u64>,
    pub workers_per_kind: NonZeroUsize,
    pub queue_capacity: NonZeroUsize,
    pub time_budget: Option<Duration>,
    pub min_cycle: Option<Duration>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chain_config: ChainConfig::mainnet(),
            mode: Mode::default(),
            kinds: enum_iterator::all().collect(),
            limit: None,
            workers_per_kind: nonzero!(1_usize),
            queue_capacity: nonzero!(2_usize),
            time_budget: None,
            min_cycle: None,
        }
    }
}
