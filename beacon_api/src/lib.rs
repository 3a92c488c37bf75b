pub use crate::{
    api::BeaconNodeApi,
    error::Error,
    host_pool::{Failover, HostPool},
    http::{HttpBeaconNode, PAGE_SIZE},
};

mod api;
mod error;
mod host_pool;
mod http;
mod responses;
