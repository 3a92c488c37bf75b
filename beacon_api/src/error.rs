use thiserror::Error;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("bad request to beacon node (beacon node response: {message})")]
    BadRequest { message: String },
    #[error("beacon node internal error (beacon node response: {message})")]
    NodeInternalError { message: String },
    #[error("none of the configured beacon nodes are reachable")]
    NoReachableHosts,
    #[error("none of the beacon nodes returned the chain head")]
    ChainHeadUnavailable,
}
