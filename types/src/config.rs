use core::num::NonZeroU64;

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};

use crate::primitives::UnixSeconds;

/// Chain parameters needed to translate between slots, epochs and wall-clock time.
///
/// Only the parameters the cacher actually uses are represented.
/// Everything else about the chain is the beacon node's concern.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub slots_per_epoch: NonZeroU64,
    pub seconds_per_slot: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub genesis_time: UnixSeconds,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl ChainConfig {
    #[must_use]
    pub const fn mainnet() -> Self {
        Self {
            slots_per_epoch: nonzero!(32_u64),
            seconds_per_slot: nonzero!(12_u64),
            genesis_time: 1_606_824_023,
        }
    }

    #[must_use]
    pub const fn with_genesis_time(self, genesis_time: UnixSeconds) -> Self {
        Self {
            genesis_time,
            ..self
        }
    }

    #[must_use]
    pub const fn with_seconds_per_slot(self, seconds_per_slot: NonZeroU64) -> Self {
        Self {
            seconds_per_slot,
            ..self
        }
    }

    #[must_use]
    pub const fn seconds_per_epoch(&self) -> u64 {
        self.slots_per_epoch
            .get()
            .saturating_mul(self.seconds_per_slot.get())
    }
}
