use anyhow::Result;
use async_trait::async_trait;
use types::{
    assignments::WireAssignments,
    containers::{Balances, Block, ChainHead, Validator},
    primitives::{Epoch, Slot},
    redacting_url::RedactingUrl,
};

/// Queries the cacher makes to a beacon node.
///
/// Every call either returns typed data or fails as a whole.
/// Retrying on another node is left to [`HostPool`](crate::HostPool).
#[async_trait]
pub trait BeaconNodeApi: Send + Sync {
    fn url(&self) -> &RedactingUrl;

    async fn node_version(&self) -> Result<String>;

    async fn chain_head(&self) -> Result<ChainHead>;

    /// Duties of every validator in `epoch`, split into pages.
    async fn epoch_assignments(&self, epoch: Epoch) -> Result<Vec<WireAssignments>>;

    async fn balances_for_epoch(&self, epoch: Epoch) -> Result<Balances>;

    async fn epoch_validators(&self, epoch: Epoch) -> Result<Vec<Validator>>;

    /// All blocks known for `slot`, including orphaned ones. Empty if the slot was missed.
    async fn blocks_by_slot(&self, slot: Slot) -> Result<Vec<Block>>;
}
