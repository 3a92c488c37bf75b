use core::future::Future;
use std::{
    io::{self, Write},
    process::ExitCode,
    sync::Arc,
};

use anyhow::Result;
use beacon_api::{HostPool, HttpBeaconNode};
use clap::{Error as ClapError, Parser as _};
use itertools::Itertools as _;
use log::{error, info, warn};
use reqwest::Client;
use tokio::runtime::Builder;
use types::primitives::Epoch;

use crate::{
    cacher_args::CacherArgs,
    cacher_config::CacherConfig,
    consts::{APPLICATION_NAME, APPLICATION_VERSION},
};

mod cacher_args;
mod cacher_config;
mod consts;

fn main() -> ExitCode {
    if let Err(error) = try_main() {
        error.downcast_ref().map(ClapError::exit);
        error!("{error:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    binary_utils::initialize_logger(module_path!(), cfg!(feature = "logger-always-write-style"))?;

    let config = CacherArgs::try_parse()?
        .try_into_config()
        .map_err(CacherArgs::clap_error)?;

    info!("starting {APPLICATION_NAME} {APPLICATION_VERSION}");
    config.report();

    block_on(run(config))
}

async fn run(config: CacherConfig) -> Result<()> {
    let CacherConfig {
        beacon_urls,
        request_timeout,
        storage_config,
        ingestion_config,
        print_head,
    } = config;

    let client = Client::builder().timeout(request_timeout).build()?;
    let chain_config = ingestion_config.chain_config;

    let pool = HostPool::connect(beacon_urls, |url| {
        Ok(HttpBeaconNode::new(client.clone(), url, chain_config))
    })
    .await?;

    info!(
        "using beacon nodes in this order: [{}]",
        pool.hosts().iter().format(", "),
    );

    if print_head {
        let head = ingestion::resolve_head(&ingestion_config, &pool).await?;
        return write_head(io::stdout().lock(), head);
    }

    let store = Arc::new(storage_config.open()?);

    info!("storing artifacts in {}", store.describe());

    tokio::select! {
        summary = ingestion::run(&ingestion_config, Arc::new(pool), store) => {
            summary?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            warn!("interrupted; epochs still in progress are abandoned");
        }
    }

    Ok(())
}

fn write_head(mut output: impl Write, head: Epoch) -> Result<()> {
    writeln!(output, "{head}")?;
    output.flush().map_err(Into::into)
}

fn block_on(future: impl Future<Output = Result<()>>) -> Result<()> {
    Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(future)
}
