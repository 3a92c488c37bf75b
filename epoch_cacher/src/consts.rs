use core::time::Duration;

pub const APPLICATION_NAME: &str = "epoch_cacher";
pub const APPLICATION_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
