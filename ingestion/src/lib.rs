//! Fetching per-epoch data from beacon nodes and storing it as artifacts.

pub use crate::{
    driver::{resolve_head, resolve_schedule, run, OutcomeCounts, RunSummary},
    ingestion_config::{IngestionConfig, Mode, DEFAULT_FLOOR_EPOCH},
};

pub mod schedule;
pub mod worker;

mod driver;
mod ingestion_config;
