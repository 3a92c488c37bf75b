// Response bodies of the standard Beacon Node API. Fields the cacher does not store are omitted.

use std::sync::Arc;

use serde::Deserialize;
use types::{
    containers::{
        Attestation, AttesterSlashing, Checkpoint, Deposit, Eth1Data, ProposerSlashing,
        SignedBeaconBlockHeader, SignedVoluntaryExit,
    },
    primitives::{
        CommitteeIndex, Epoch, Gwei, PublicKeyBytes, SignatureBytes, Slot, ValidatorIndex, H256,
    },
};

#[derive(Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Deserialize)]
pub struct NodeVersion {
    pub version: String,
}

#[derive(Deserialize)]
pub struct BlockHeader {
    pub root: H256,
    pub canonical: bool,
    pub header: SignedBeaconBlockHeader,
}

#[derive(Deserialize)]
pub struct FinalityCheckpoints {
    pub previous_justified: Checkpoint,
    pub current_justified: Checkpoint,
    pub finalized: Checkpoint,
}

#[derive(Deserialize)]
pub struct ProposerDuty {
    #[serde(with = "serde_utils::string_or_native")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
}

#[derive(Deserialize)]
pub struct Committee {
    #[serde(with = "serde_utils::string_or_native")]
    pub index: CommitteeIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native_sequence")]
    pub validators: Arc<[ValidatorIndex]>,
}

#[derive(Deserialize)]
pub struct ValidatorBalance {
    #[serde(with = "serde_utils::string_or_native")]
    pub index: ValidatorIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub balance: Gwei,
}

#[derive(Deserialize)]
pub struct ValidatorEntry {
    #[serde(with = "serde_utils::string_or_native")]
    pub index: ValidatorIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub balance: Gwei,
    pub validator: ValidatorRecord,
}

#[derive(Deserialize)]
pub struct ValidatorRecord {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub effective_balance: Gwei,
    pub slashed: bool,
    #[serde(with = "serde_utils::string_or_native")]
    pub activation_eligibility_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub activation_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub exit_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub withdrawable_epoch: Epoch,
}

#[derive(Deserialize)]
pub struct SignedBlock {
    pub message: BlockMessage,
    pub signature: SignatureBytes,
}

#[derive(Deserialize)]
pub struct BlockMessage {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BlockBody,
}

#[derive(Deserialize)]
pub struct BlockBody {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: H256,
    pub proposer_slashings: Vec<ProposerSlashing>,
    pub attester_slashings: Vec<AttesterSlashing>,
    pub attestations: Vec<Attestation>,
    pub deposits: Vec<Deposit>,
    pub voluntary_exits: Vec<SignedVoluntaryExit>,
}
