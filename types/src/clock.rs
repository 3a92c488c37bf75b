//! Conversions between slots, epochs and Unix time.
//!
//! Times before genesis saturate to slot 0 and epoch 0.

use core::ops::Range;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use crate::{
    config::ChainConfig,
    primitives::{Epoch, Slot, UnixSeconds},
};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[must_use]
pub const fn epoch_at_slot(config: &ChainConfig, slot: Slot) -> Epoch {
    slot / config.slots_per_epoch.get()
}

#[must_use]
pub const fn start_slot_of_epoch(config: &ChainConfig, epoch: Epoch) -> Slot {
    epoch.saturating_mul(config.slots_per_epoch.get())
}

#[must_use]
pub const fn slots_in_epoch(config: &ChainConfig, epoch: Epoch) -> Range<Slot> {
    let start = start_slot_of_epoch(config, epoch);
    let end = start_slot_of_epoch(config, epoch.saturating_add(1));
    start..end
}

#[must_use]
pub const fn timestamp_at_slot(config: &ChainConfig, slot: Slot) -> UnixSeconds {
    config
        .genesis_time
        .saturating_add(slot.saturating_mul(config.seconds_per_slot.get()))
}

#[must_use]
pub const fn slot_at_timestamp(config: &ChainConfig, timestamp: UnixSeconds) -> Slot {
    timestamp.saturating_sub(config.genesis_time) / config.seconds_per_slot.get()
}

#[must_use]
pub const fn timestamp_at_epoch(config: &ChainConfig, epoch: Epoch) -> UnixSeconds {
    timestamp_at_slot(config, start_slot_of_epoch(config, epoch))
}

#[must_use]
pub const fn epoch_at_timestamp(config: &ChainConfig, timestamp: UnixSeconds) -> Epoch {
    epoch_at_slot(config, slot_at_timestamp(config, timestamp))
}

/// Start of the `day`th day counted from genesis.
#[must_use]
pub const fn timestamp_at_day(config: &ChainConfig, day: u64) -> UnixSeconds {
    config
        .genesis_time
        .saturating_add(day.saturating_mul(SECONDS_PER_DAY))
}

#[must_use]
pub const fn epochs_per_day(config: &ChainConfig) -> u64 {
    SECONDS_PER_DAY / config.seconds_per_epoch()
}

pub fn current_epoch(config: &ChainConfig) -> Result<Epoch> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    Ok(epoch_at_timestamp(config, now))
}
